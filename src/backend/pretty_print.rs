use colored::Colorize;
use itertools::Itertools;

use crate::middle::{
    quadruple::{Operand, OperatorClass, Quadruple, QuadrupleProgram},
    symbols::FunctionDirectory,
};

fn operand(slot: &Option<Operand>) -> String {
    match slot {
        Some(Operand::Address(address)) => address.to_string().white().to_string(),
        Some(Operand::Function(name)) => name.blue().to_string(),
        Some(Operand::Target(target)) => format!("@{target}").bright_red().to_string(),
        None => "_".dimmed().to_string(),
    }
}

fn pretty_print_quadruple(quadruple: &Quadruple) -> String {
    let operator = quadruple.operator.to_string();
    let operator = match quadruple.operator.class() {
        OperatorClass::Arithmetic | OperatorClass::Relational => operator.white(),
        OperatorClass::Assignment => operator.green(),
        OperatorClass::Control => operator.cyan(),
    };

    format!(
        "{operator:<8} {:<6} {:<6} {}",
        operand(&quadruple.first),
        operand(&quadruple.second),
        operand(&quadruple.result)
    )
}

pub fn pretty_print_program(program: &QuadrupleProgram) {
    println!("{}", "quadruples:".bold());

    for (id, quadruple) in program.quadruples.enumerate() {
        println!(
            "{:>5}  {}",
            id.to_string().bright_red(),
            pretty_print_quadruple(quadruple)
        );
    }

    println!("{}", "constants:".bold());

    for constant in program.constants.iter() {
        println!(
            "{:>6}  {} {}",
            constant.address.to_string().white(),
            constant.text.yellow(),
            format!("({})", constant.ty).dimmed()
        );
    }
}

pub fn pretty_print_directory(directory: &FunctionDirectory) {
    let global = directory.global();

    println!("{}", "globals:".bold());
    for variable in global.variables.sorted() {
        println!(
            "    {} {} {}",
            variable.address.to_string().white(),
            variable.name.blue(),
            variable.ty.to_string().magenta()
        );
    }

    for function in directory.functions() {
        let return_type = function
            .return_type
            .map(|ty| ty.to_string())
            .unwrap_or_else(|| "void".to_string());

        println!(
            "{} {}({}) {} {}",
            return_type.magenta(),
            function.name.blue(),
            function
                .parameters
                .iter()
                .map(|parameter| format!("{}: {}", parameter.name, parameter.ty))
                .join(", "),
            "starts at".dimmed(),
            function.start.to_string().bright_red()
        );

        for variable in function.variables.sorted() {
            println!(
                "    {} {} {}",
                variable.address.to_string().white(),
                variable.name.blue(),
                variable.ty.to_string().magenta()
            );
        }
    }
}

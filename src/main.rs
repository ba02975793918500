use std::{
    io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{CommandFactory, Parser as ClapParser, Subcommand, error::ErrorKind};
use colored::Colorize;
use patitoc::{
    CompileError,
    backend::{
        pretty_print::{pretty_print_directory, pretty_print_program},
        tables::{self, CONSTANTS_FILE, QUADRUPLES_FILE},
    },
    compile_source,
    frontend::{SourceFile, SourceFileOrigin},
    middle::quadruple::QuadrupleProgram,
    runtime::{VirtualMachine, VmConfig, vm::DEFAULT_MAX_CALL_DEPTH},
};

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Print diagnostics without colour
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a program into its quadruple and constant tables
    Compile {
        source: PathBuf,

        /// Directory the tables are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Print the generated program and function directory
        #[arg(long)]
        dump: bool,
    },

    /// Run previously compiled tables
    Run {
        #[arg(long, default_value = QUADRUPLES_FILE)]
        quadruples: PathBuf,

        #[arg(long, default_value = CONSTANTS_FILE)]
        constants: PathBuf,

        #[command(flatten)]
        vm: VmArgs,
    },

    /// Compile and run a program without writing any tables
    Exec {
        source: PathBuf,

        /// Print the generated program and function directory
        #[arg(long)]
        dump: bool,

        #[command(flatten)]
        vm: VmArgs,
    },
}

#[derive(Debug, clap::Args)]
struct VmArgs {
    /// Trace every instruction, its operands and the memory after it
    #[arg(short, long)]
    verbose: bool,

    /// Nested calls allowed before execution is aborted
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

impl From<VmArgs> for VmConfig {
    fn from(args: VmArgs) -> Self {
        Self {
            verbose: args.verbose,
            max_call_depth: args.max_call_depth,
        }
    }
}

fn validate_input_file(path: &Path) {
    if !path.exists() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Input file '{}' does not exist!", path.display()),
            )
            .exit()
    }

    if !path.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Input path '{}' is not a file!", path.display()),
            )
            .exit()
    }
}

fn report_error(error: impl std::fmt::Display) {
    eprintln!("{} {error}", "error:".red().bold());
}

/// Compiles a source file, reporting every problem found. Returns `None` if
/// the program must not be persisted or run.
fn compile(path: &Path, dump: bool) -> Option<QuadrupleProgram> {
    validate_input_file(path);

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            report_error(format!("failed to read '{}': {error}", path.display()));
            return None;
        }
    };

    let source = SourceFile {
        contents,
        origin: SourceFileOrigin::File(path.to_path_buf()),
    };

    let generation = match compile_source(&source) {
        Ok(generation) => generation,
        Err(CompileError::Parse(error)) => {
            error.report(&source);
            return None;
        }
        Err(error) => {
            report_error(error);
            return None;
        }
    };

    if dump {
        pretty_print_program(&generation.program);
        pretty_print_directory(&generation.directory);
    }

    if !generation.is_valid() {
        for error in &generation.errors {
            report_error(error);
        }

        eprintln!(
            "{}",
            format!(
                "compilation failed with {} error(s)",
                generation.errors.len()
            )
            .red()
        );
        return None;
    }

    Some(generation.program)
}

fn execute(program: &QuadrupleProgram, config: VmConfig) -> ExitCode {
    let stdout = io::stdout().lock();

    let mut vm = match VirtualMachine::new(program, config, stdout) {
        Ok(vm) => vm,
        Err(error) => {
            report_error(error);
            return ExitCode::FAILURE;
        }
    };

    match vm.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(fault) => {
            eprintln!("{} {fault}", "runtime error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    match args.command {
        Command::Compile {
            source,
            out_dir,
            dump,
        } => {
            let Some(program) = compile(&source, dump) else {
                return ExitCode::FAILURE;
            };

            if let Err(error) = std::fs::create_dir_all(&out_dir) {
                report_error(format!(
                    "failed to create '{}': {error}",
                    out_dir.display()
                ));
                return ExitCode::FAILURE;
            }

            let quadruples = out_dir.join(QUADRUPLES_FILE);
            let constants = out_dir.join(CONSTANTS_FILE);

            match tables::save(&program, &quadruples, &constants) {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    report_error(error);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Run {
            quadruples,
            constants,
            vm,
        } => {
            validate_input_file(&quadruples);
            validate_input_file(&constants);

            match tables::load(&quadruples, &constants) {
                Ok(program) => execute(&program, vm.into()),
                Err(error) => {
                    report_error(error);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Exec { source, dump, vm } => match compile(&source, dump) {
            Some(program) => execute(&program, vm.into()),
            None => ExitCode::FAILURE,
        },
    }
}

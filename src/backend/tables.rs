//! Line based text tables used to hand a generated program to the virtual
//! machine.
//!
//! Quadruple table: `operator,operand1,operand2,result` per line, unused slots
//! left empty, line index = quadruple index. Constant table:
//! `address,literal,type` per line. Literals keep their source text so string
//! literals still carry their quotes (and may contain commas).

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{
    index::{Index, IndexVec},
    middle::{
        memory::Address,
        primitive::ValueType,
        quadruple::{
            Constant, ConstantTable, Operand, Operator, Quadruple, QuadrupleId, QuadrupleProgram,
        },
    },
};

pub const QUADRUPLES_FILE: &str = "quadruples.txt";
pub const CONSTANTS_FILE: &str = "constants.txt";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("line {line}: expected {expected} comma separated fields but found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: `{text}` is not a valid address")]
    InvalidAddress { line: usize, text: String },

    #[error("line {line}: `{text}` is not a valid quadruple index")]
    InvalidTarget { line: usize, text: String },

    #[error("line {line}: unknown value type `{text}`")]
    UnknownType { line: usize, text: String },

    #[error("failed to access `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn write_quadruples(
    quadruples: &IndexVec<QuadrupleId, Quadruple>,
    out: &mut impl Write,
) -> io::Result<()> {
    for quadruple in quadruples.iter() {
        writeln!(out, "{quadruple}")?;
    }

    Ok(())
}

pub fn write_constants(constants: &ConstantTable, out: &mut impl Write) -> io::Result<()> {
    for constant in constants.iter() {
        writeln!(out, "{},{},{}", constant.address, constant.text, constant.ty)?;
    }

    Ok(())
}

fn parse_address(line: usize, text: &str) -> Result<Address, TableError> {
    text.parse::<u32>()
        .map(|raw| Address::new(raw as usize))
        .map_err(|_| TableError::InvalidAddress {
            line,
            text: text.to_string(),
        })
}

/// Reads one operand slot. Numbers are addresses except in the jump slot,
/// anything else names a function.
fn parse_operand(line: usize, text: &str, is_jump: bool) -> Result<Option<Operand>, TableError> {
    if text.is_empty() {
        return Ok(None);
    }

    if is_jump {
        return text
            .parse::<u32>()
            .map(|raw| Some(Operand::Target(QuadrupleId::new(raw as usize))))
            .map_err(|_| TableError::InvalidTarget {
                line,
                text: text.to_string(),
            });
    }

    if text.starts_with(|c: char| c.is_ascii_digit()) {
        return parse_address(line, text).map(|address| Some(Operand::Address(address)));
    }

    Ok(Some(Operand::Function(text.to_string())))
}

pub fn parse_quadruples(text: &str) -> Result<IndexVec<QuadrupleId, Quadruple>, TableError> {
    let mut quadruples = IndexVec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let fields = line.trim_end_matches('\r').split(',').collect::<Vec<_>>();

        let [operator, first, second, result] = fields[..] else {
            return Err(TableError::FieldCount {
                line: line_number,
                expected: 4,
                found: fields.len(),
            });
        };

        // Unknown operators are kept, the machine faults when it reaches them
        let operator = operator
            .trim()
            .parse::<Operator>()
            .unwrap_or_else(|_| Operator::Unknown(operator.to_string()));
        let is_jump = operator.targets_quadruple();

        quadruples.push(Quadruple::new(
            operator,
            parse_operand(line_number, first.trim(), false)?,
            parse_operand(line_number, second.trim(), false)?,
            parse_operand(line_number, result.trim(), is_jump)?,
        ));
    }

    Ok(quadruples)
}

pub fn parse_constants(text: &str) -> Result<ConstantTable, TableError> {
    let mut constants = ConstantTable::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            continue;
        }

        // The literal sits between the first and the last comma
        let (Some((address, rest)), Some((_, ty))) = (line.split_once(','), line.rsplit_once(','))
        else {
            return Err(TableError::FieldCount {
                line: line_number,
                expected: 3,
                found: 1,
            });
        };

        let Some((literal, _)) = rest.rsplit_once(',') else {
            return Err(TableError::FieldCount {
                line: line_number,
                expected: 3,
                found: 2,
            });
        };

        let ty = ty
            .trim()
            .parse::<ValueType>()
            .map_err(|_| TableError::UnknownType {
                line: line_number,
                text: ty.to_string(),
            })?;

        constants.insert(Constant {
            address: parse_address(line_number, address.trim())?,
            text: literal.to_string(),
            ty,
        });
    }

    Ok(constants)
}

fn read(path: &Path) -> Result<String, TableError> {
    fs::read_to_string(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(
    path: &Path,
    contents: impl FnOnce(&mut Vec<u8>) -> io::Result<()>,
) -> Result<(), TableError> {
    let io_error = |source| TableError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut buffer = Vec::new();
    contents(&mut buffer).map_err(io_error)?;
    fs::write(path, buffer).map_err(io_error)
}

/// Writes both tables of a program
pub fn save(
    program: &QuadrupleProgram,
    quadruples_path: &Path,
    constants_path: &Path,
) -> Result<(), TableError> {
    write_file(quadruples_path, |out| {
        write_quadruples(&program.quadruples, out)
    })?;
    write_file(constants_path, |out| write_constants(&program.constants, out))?;

    log::info!(
        "wrote {} quadruples to {} and {} constants to {}",
        program.quadruples.len(),
        quadruples_path.display(),
        program.constants.len(),
        constants_path.display()
    );

    Ok(())
}

/// Reads a program back from its two tables
pub fn load(quadruples_path: &Path, constants_path: &Path) -> Result<QuadrupleProgram, TableError> {
    let program = QuadrupleProgram {
        quadruples: parse_quadruples(&read(quadruples_path)?)?,
        constants: parse_constants(&read(constants_path)?)?,
    };

    log::info!(
        "loaded {} quadruples and {} constants",
        program.quadruples.len(),
        program.constants.len()
    );

    Ok(program)
}

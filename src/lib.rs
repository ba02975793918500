//! Compiler and virtual machine for the Patito teaching language.
//!
//! Source text is parsed into a tree ([`frontend`]), walked once to produce
//! quadruples over a segmented virtual address space ([`middle`]), persisted
//! as text tables ([`backend`]) and finally executed ([`runtime`]).

use thiserror::Error;

use crate::{
    frontend::{ParseError, SourceFile, parser::Parser},
    middle::{
        codegen::{Generation, QuadrupleGenerator},
        diagnostics::GenerationError,
    },
};

pub mod backend;
pub mod frontend;
pub mod index;
pub mod middle;
pub mod runtime;

/// Reasons compilation could not even produce a list of semantic errors
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Parses and generates a whole program. Semantic errors do not fail this
/// call, they are listed in the returned [`Generation`].
pub fn compile_source(source: &SourceFile) -> Result<Generation, CompileError> {
    let program = Parser::parse_program(source)?;
    log::debug!(
        "parsed program `{}` with {} function(s)",
        program.name.name,
        program.functions.len()
    );

    Ok(QuadrupleGenerator::generate(&program)?)
}

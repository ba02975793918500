use thiserror::Error;

use super::{memory::AddressSpaceExhausted, primitive::ValueType, quadruple::Operator};

/// Recoverable problems found while generating quadruples. They are collected
/// in source order and generation keeps going after each one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("variable `{name}` is already declared in scope `{scope}`")]
    DuplicateDeclaration { name: String, scope: String },

    #[error("function `{name}` is already declared")]
    DuplicateFunction { name: String },

    #[error("parameter `{name}` is declared twice in function `{function}`")]
    DuplicateParameter { name: String, function: String },

    #[error("variable `{name}` is not declared in scope `{scope}`")]
    UndeclaredVariable { name: String, scope: String },

    #[error("function `{name}` is not declared")]
    UndeclaredFunction { name: String },

    #[error("integer literal `{literal}` does not fit in 64 bits")]
    IntegerOutOfRange { literal: String },

    #[error("cannot apply `{operator}` to {left} and {right}")]
    InvalidOperation {
        left: ValueType,
        operator: Operator,
        right: ValueType,
    },

    #[error("cannot assign a {value} value to `{name}` of type {target}")]
    IncompatibleAssignment {
        name: String,
        target: ValueType,
        value: ValueType,
    },

    #[error("condition of `{statement}` must be boolean but is {found}")]
    NonBooleanCondition {
        statement: &'static str,
        found: ValueType,
    },

    #[error("function `{function}` expects {expected} argument(s) but {found} were given")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "argument {position} of `{function}` must be {expected} but a {found} value was given"
    )]
    ArgumentTypeMismatch {
        function: String,
        position: usize,
        expected: ValueType,
        found: ValueType,
    },
}

/// Conditions that make the program impossible to represent. They abort
/// generation immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error(transparent)]
    AddressSpaceExhausted(#[from] AddressSpaceExhausted),
}

use thiserror::Error;

use crate::middle::{memory::Address, primitive::ValueType, quadruple::QuadrupleId};

/// Faults that stop the virtual machine. None of them are recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("read of address {address} before anything was written to it")]
    UninitializedOperand { address: Address },

    #[error("address {address} is not a valid {access} target")]
    InvalidAddress {
        address: Address,
        access: &'static str,
    },

    #[error("no activation record was staged with ERA")]
    NoPendingActivation,

    #[error("ENDFUNC reached without a pending call")]
    EmptyReturnStack,

    #[error("unknown instruction `{operator}`")]
    UnknownInstruction { operator: String },

    #[error("expected {expected} but found a {found} value")]
    TypeMismatch { expected: String, found: ValueType },

    #[error("instruction is missing its {slot}")]
    MissingOperand { slot: &'static str },

    #[error("call depth exceeded the limit of {limit}")]
    CallDepthExceeded { limit: usize },

    #[error("constant `{text}` at {address} is not a valid {ty} literal")]
    InvalidConstant {
        address: Address,
        text: String,
        ty: ValueType,
    },

    #[error("failed to write program output: {0}")]
    Output(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(error: std::io::Error) -> Self {
        Self::Output(error.to_string())
    }
}

/// A runtime error along with the quadruple that raised it
#[derive(Debug, Clone, PartialEq, Error)]
#[error("runtime error at quadruple {index}: {error}")]
pub struct RuntimeFault {
    pub index: QuadrupleId,
    #[source]
    pub error: RuntimeError,
}

//! Virtual machine for quadruple programs.
//!
//! The machine fetches quadruples starting at index 0 and interprets them
//! against a [`memory::RuntimeMemory`] laid out like the generator's address
//! space. Calls push a fresh frame for the local and temporary segments and
//! remember where to come back to.

pub mod error;
pub mod memory;
pub mod value;
pub mod vm;

pub use error::{RuntimeError, RuntimeFault};
pub use value::Value;
pub use vm::{VirtualMachine, VmConfig};

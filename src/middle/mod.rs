//! Names are resolved and type checked here while the parse tree is walked
//! once and flattened into quadruples over the segmented address space.

pub mod codegen;
pub mod diagnostics;
pub mod memory;
pub mod primitive;
pub mod quadruple;
pub mod semantic_cube;
pub mod symbols;

//! The backend deals with the finished quadruple program: persisting it as
//! the text tables the virtual machine loads, and printing it for inspection.

pub mod pretty_print;
pub mod tables;

//! ZDCode syntax: parse-tree input, IR nodes and state counts, diagnostics.

pub mod ast;
pub mod diagnostics;
pub mod ir;

pub use ast::*;
pub use diagnostics::*;
pub use ir::*;

pub mod interpreter;
pub mod mips;

use crate::error::CompileError;
use crate::ir::ast;

/// A consumer of a parsed program.
///
/// The interpreter executes the program immediately; the MIPS backend turns it
/// into assembly text. Both read the same AST and never interact.
pub trait Backend {
    type Output;

    fn name(&self) -> &'static str;

    fn run(&mut self, program: &ast::Program) -> Result<Self::Output, CompileError>;
}

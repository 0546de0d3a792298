pub mod lexer;
pub mod parser;

use crate::error::CompileError;
use crate::ir::ast;

/// Front end: source text to a validated AST.
pub fn parse(source: &str) -> Result<ast::Program, CompileError> {
    let program = parser::parse_tokens(lexer::Lexer::new(source))?;
    Ok(program)
}

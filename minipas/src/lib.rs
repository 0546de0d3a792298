//! A compiler and interpreter for a small Pascal-like language.
//!
//! Source text is lexed and parsed into an AST, which is then handed to one of
//! two backends: a tree-walking [`Interpreter`] or the [`MipsBackend`] code
//! generator.

pub mod backends;
pub mod error;
pub mod ir;
pub mod parser;
pub mod span;

use std::collections::VecDeque;

pub use backends::Backend;
pub use backends::interpreter::{InputSource, Interpreter, LineInput};
pub use backends::mips::{MipsBackend, MipsConfig};
pub use error::CompileError;

/// Parses `source` and hands the program to `backend`.
pub fn run<B: Backend>(source: &str, backend: &mut B) -> Result<B::Output, CompileError> {
    let program = parser::parse(source)?;
    backend.run(&program)
}

/// Interprets `source`, feeding READLN from `input`, and returns what it printed.
pub fn interpret(
    source: &str,
    input: impl IntoIterator<Item = i32>,
) -> Result<String, CompileError> {
    let mut interpreter = Interpreter::new(Vec::new(), input.into_iter().collect::<VecDeque<_>>());
    run(source, &mut interpreter)?;
    Ok(String::from_utf8_lossy(&interpreter.into_output()).into_owned())
}

/// Compiles `source` to MIPS assembly with the default configuration.
pub fn compile(source: &str) -> Result<String, CompileError> {
    run(source, &mut MipsBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_report_their_names() {
        let interpreter = Interpreter::new(Vec::new(), VecDeque::new());
        assert_eq!(interpreter.name(), "interpreter");
        assert_eq!(MipsBackend::new().name(), "mips");
    }

    #[test]
    fn interpret_collects_output() {
        assert_eq!(
            interpret("VAR a; BEGIN READLN(a); WRITELN(a * 2); END.", [21]).unwrap(),
            "42\n"
        );
    }

    #[test]
    fn front_end_errors_surface_from_both_entry_points() {
        assert!(matches!(compile("BEGIN"), Err(CompileError::Parse(_))));
        assert!(matches!(interpret("@", std::iter::empty()), Err(CompileError::Lex(_))));
    }
}

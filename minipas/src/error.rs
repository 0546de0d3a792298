use thiserror::Error;

use crate::span::Span;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at {span}")]
    UnexpectedCharacter { character: char, span: Span },

    #[error("Integer literal '{literal}' at {span} does not fit in 32 bits")]
    IntegerOverflow { literal: String, span: Span },

    #[error("Unterminated block comment starting at {span}")]
    UnterminatedComment { span: Span },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Syntax error at {span}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Name '{name}' is declared more than once in {scope}")]
    DuplicateName { name: String, scope: String },

    #[error("Procedure '{name}' is declared more than once")]
    DuplicateProcedure { name: String },

    #[error("Procedure '{name}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("Undefined procedure '{name}'")]
    UndefinedProcedure { name: String },

    #[error("Procedure '{name}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("READLN requested a value but the input is exhausted")]
    InputExhausted,

    #[error("READLN expected an integer, got '{text}'")]
    InvalidInput { text: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Call to undefined procedure '{name}'")]
    UndefinedProcedure { name: String },

    #[error("Failed to write assembly text")]
    Format(#[from] std::fmt::Error),
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Backend error: {0}")]
    Codegen(#[from] CodegenError),

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

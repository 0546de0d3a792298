use std::fmt;
use std::str::Chars;

use crate::error::LexError;
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Procedure,
    Var,
    Begin,
    End,
    While,
    If,
    Then,
    Do,
    Writeln,
    Readln,
    Mod,
    // Operators
    Assign, // :=
    Plus,   // +
    Minus,  // -
    Star,   // *
    Slash,  // /
    LParen, // (
    RParen, // )
    // Relational operators
    Equal,        // =
    NotEqual,     // <>
    Less,         // <
    Greater,      // >
    LessEqual,    // <=
    GreaterEqual, // >=
    // Delimiters
    Semicolon,
    Comma,
    // Identifiers and literals
    Identifier(String),
    Number(i32),
    // Terminal marker, produced by the trailing period or the end of the text
    Eof,
}

/// Coarse classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Identifier,
    Keyword,
    Number,
    Operator,
    Relational,
    Delimiter,
    EndOfInput,
}

impl TokenKind {
    pub fn class(&self) -> TokenClass {
        match self {
            Self::Procedure
            | Self::Var
            | Self::Begin
            | Self::End
            | Self::While
            | Self::If
            | Self::Then
            | Self::Do
            | Self::Writeln
            | Self::Readln
            | Self::Mod => TokenClass::Keyword,
            Self::Assign
            | Self::Plus
            | Self::Minus
            | Self::Star
            | Self::Slash
            | Self::LParen
            | Self::RParen => TokenClass::Operator,
            Self::Equal
            | Self::NotEqual
            | Self::Less
            | Self::Greater
            | Self::LessEqual
            | Self::GreaterEqual => TokenClass::Relational,
            Self::Semicolon | Self::Comma => TokenClass::Delimiter,
            Self::Identifier(_) => TokenClass::Identifier,
            Self::Number(_) => TokenClass::Number,
            Self::Eof => TokenClass::EndOfInput,
        }
    }

    fn keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "PROCEDURE" => Self::Procedure,
            "VAR" => Self::Var,
            "BEGIN" => Self::Begin,
            "END" => Self::End,
            "WHILE" => Self::While,
            "IF" => Self::If,
            "THEN" => Self::Then,
            "DO" => Self::Do,
            "WRITELN" => Self::Writeln,
            "READLN" => Self::Readln,
            "mod" => Self::Mod,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Procedure => "PROCEDURE",
            Self::Var => "VAR",
            Self::Begin => "BEGIN",
            Self::End => "END",
            Self::While => "WHILE",
            Self::If => "IF",
            Self::Then => "THEN",
            Self::Do => "DO",
            Self::Writeln => "WRITELN",
            Self::Readln => "READLN",
            Self::Mod => "mod",
            Self::Assign => ":=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Semicolon => ";",
            Self::Comma => ",",
            Self::Identifier(name) => return f.write_str(name),
            Self::Number(value) => return write!(f, "{value}"),
            Self::Eof => ".",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn class(&self) -> TokenClass {
        self.kind.class()
    }
}

/// Lazy tokenizer: each call to `next` scans exactly one token.
///
/// The sequence always ends with a single [`TokenKind::Eof`], after which the
/// iterator is exhausted. The first error also ends the sequence.
pub struct Lexer<'a> {
    chars: Chars<'a>,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars(),
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Skips whitespace and both comment forms.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(' ' | '\t' | '\r' | '\n'), _) => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.bump() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.span();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(LexError::UnterminatedComment { span: start }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_number(&mut self, span: Span) -> Result<TokenKind, LexError> {
        let mut literal = String::new();
        while let Some(ch @ '0'..='9') = self.peek() {
            literal.push(ch);
            self.bump();
        }

        literal
            .parse()
            .map(TokenKind::Number)
            .map_err(|_| LexError::IntegerOverflow { literal, span })
    }

    fn scan_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_alphanumeric() {
                break;
            }
            word.push(ch);
            self.bump();
        }

        TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier(word))
    }

    /// Consumes `first` and, when the next character is `second`, that too.
    fn one_or_two(&mut self, second: char, single: TokenKind, double: TokenKind) -> TokenKind {
        self.bump();
        if self.peek() == Some(second) {
            self.bump();
            double
        } else {
            single
        }
    }

    fn scan_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let span = self.span();
        let Some(ch) = self.peek() else {
            self.finished = true;
            return Ok(Token {
                kind: TokenKind::Eof,
                span,
            });
        };

        let kind = match ch {
            '0'..='9' => self.scan_number(span)?,
            'a'..='z' | 'A'..='Z' => self.scan_word(),
            '.' => {
                self.bump();
                self.finished = true;
                TokenKind::Eof
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('>') => {
                        self.bump();
                        TokenKind::NotEqual
                    }
                    Some('=') => {
                        self.bump();
                        TokenKind::LessEqual
                    }
                    _ => TokenKind::Less,
                }
            }
            '>' => self.one_or_two('=', TokenKind::Greater, TokenKind::GreaterEqual),
            ':' => {
                self.bump();
                if self.peek() != Some('=') {
                    return Err(LexError::UnexpectedCharacter {
                        character: ':',
                        span,
                    });
                }
                self.bump();
                TokenKind::Assign
            }
            _ => {
                let kind = match ch {
                    '=' => TokenKind::Equal,
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ';' => TokenKind::Semicolon,
                    ',' => TokenKind::Comma,
                    _ => {
                        return Err(LexError::UnexpectedCharacter {
                            character: ch,
                            span,
                        });
                    }
                };
                self.bump();
                kind
            }
        };

        Ok(Token { kind, span })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.scan_token();
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Scans the whole source eagerly.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

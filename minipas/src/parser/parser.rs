use std::collections::{HashMap, HashSet};

use super::lexer::{Token, TokenKind};
use crate::error::{CompileError, LexError, ParseError};
use crate::ir::ast;
use crate::span::Span;

/// Parses a token stream into a validated program.
///
/// Tokens are pulled one at a time, so a lexer error is reported at the point
/// the parser reaches it.
pub fn parse_tokens<I>(tokens: I) -> Result<ast::Program, CompileError>
where
    I: IntoIterator<Item = Result<Token, LexError>>,
{
    let mut parser = Parser::new(tokens.into_iter())?;
    let program = parser.parse_program()?;
    validate(&program)?;
    Ok(program)
}

struct Parser<I> {
    tokens: I,
    current: Token,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, LexError>>,
{
    fn new(mut tokens: I) -> Result<Self, CompileError> {
        let current = Self::pull(&mut tokens, Span::default())?;
        Ok(Self { tokens, current })
    }

    fn pull(tokens: &mut I, span: Span) -> Result<Token, LexError> {
        match tokens.next() {
            Some(token) => token,
            None => Ok(Token {
                kind: TokenKind::Eof,
                span,
            }),
        }
    }

    fn parse_program(&mut self) -> Result<ast::Program, CompileError> {
        let variables = if self.check(&TokenKind::Var) {
            self.parse_var_list()?
        } else {
            Vec::new()
        };

        let mut procedures = Vec::new();
        while self.check(&TokenKind::Procedure) {
            procedures.push(self.parse_procedure()?);
        }

        let statement = self.parse_statement()?;
        self.expect(TokenKind::Eof, "'.' after the program statement")?;

        Ok(ast::Program {
            variables,
            procedures,
            statement,
        })
    }

    /// VAR a, b, c;
    fn parse_var_list(&mut self) -> Result<Vec<String>, CompileError> {
        self.expect(TokenKind::Var, "VAR")?;
        let mut names = vec![self.expect_identifier()?];
        while self.consume(&TokenKind::Comma)? {
            names.push(self.expect_identifier()?);
        }
        self.expect(TokenKind::Semicolon, "';' after variable list")?;
        Ok(names)
    }

    /// PROCEDURE name(params); [VAR locals;] statement
    fn parse_procedure(&mut self) -> Result<ast::ProcedureDeclaration, CompileError> {
        self.expect(TokenKind::Procedure, "PROCEDURE")?;
        let name = self.expect_identifier()?;

        self.expect(TokenKind::LParen, "'(' after procedure name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            while self.consume(&TokenKind::Comma)? {
                params.push(self.expect_identifier()?);
            }
        }
        self.expect(TokenKind::RParen, "')' after parameters")?;
        self.expect(TokenKind::Semicolon, "';' after procedure header")?;

        let locals = if self.check(&TokenKind::Var) {
            self.parse_var_list()?
        } else {
            Vec::new()
        };

        let body = self.parse_statement()?;
        Ok(ast::ProcedureDeclaration {
            name,
            params,
            locals,
            body,
        })
    }

    fn parse_statement(&mut self) -> Result<ast::Statement, CompileError> {
        match &self.current.kind {
            TokenKind::Begin => self.parse_block(),
            TokenKind::Identifier(_) => self.parse_assignment(),
            TokenKind::Writeln => self.parse_writeln(),
            TokenKind::Readln => self.parse_readln(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    /// BEGIN {statement} END [;]
    fn parse_block(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect(TokenKind::Begin, "BEGIN")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::End) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::End, "END")?;
        self.consume(&TokenKind::Semicolon)?;
        Ok(ast::Statement::Block(statements))
    }

    fn parse_assignment(&mut self) -> Result<ast::Statement, CompileError> {
        let target = self.expect_identifier()?;
        self.expect(TokenKind::Assign, "':=' after variable name")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "';' after assignment")?;
        Ok(ast::Statement::Assign { target, value })
    }

    fn parse_writeln(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect(TokenKind::Writeln, "WRITELN")?;
        self.expect(TokenKind::LParen, "'(' after WRITELN")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')' after WRITELN argument")?;
        self.expect(TokenKind::Semicolon, "';' after WRITELN")?;
        Ok(ast::Statement::Writeln(value))
    }

    fn parse_readln(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect(TokenKind::Readln, "READLN")?;
        self.expect(TokenKind::LParen, "'(' after READLN")?;
        let target = self.expect_identifier()?;
        self.expect(TokenKind::RParen, "')' after READLN target")?;
        self.expect(TokenKind::Semicolon, "';' after READLN")?;
        Ok(ast::Statement::Readln(target))
    }

    fn parse_if(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect(TokenKind::If, "IF")?;
        let condition = self.parse_condition()?;
        self.expect(TokenKind::Then, "THEN")?;
        let body = self.parse_statement()?;
        Ok(ast::Statement::If {
            condition,
            body: Box::new(body),
        })
    }

    fn parse_while(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect(TokenKind::While, "WHILE")?;
        let condition = self.parse_condition()?;
        self.expect(TokenKind::Do, "DO")?;
        let body = self.parse_statement()?;
        Ok(ast::Statement::While {
            condition,
            body: Box::new(body),
        })
    }

    fn parse_condition(&mut self) -> Result<ast::Condition, CompileError> {
        let left = self.parse_expression()?;
        let op = match self.current.kind {
            TokenKind::Less => ast::RelationalOperator::Less,
            TokenKind::Greater => ast::RelationalOperator::Greater,
            TokenKind::LessEqual => ast::RelationalOperator::LessEqual,
            TokenKind::GreaterEqual => ast::RelationalOperator::GreaterEqual,
            TokenKind::Equal => ast::RelationalOperator::Equal,
            TokenKind::NotEqual => ast::RelationalOperator::NotEqual,
            _ => return Err(self.unexpected("a relational operator")),
        };
        self.advance()?;
        let right = self.parse_expression()?;
        Ok(ast::Condition { left, op, right })
    }

    /// expression = term {(+|-) term}
    fn parse_expression(&mut self) -> Result<ast::Expression, CompileError> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Plus => ast::BinaryOperator::Add,
                TokenKind::Minus => ast::BinaryOperator::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_term()?;
            left = ast::Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// term = factor {(*|/|mod) factor}
    fn parse_term(&mut self) -> Result<ast::Expression, CompileError> {
        let mut left = self.parse_factor()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Star => ast::BinaryOperator::Multiply,
                TokenKind::Slash => ast::BinaryOperator::Divide,
                TokenKind::Mod => ast::BinaryOperator::Modulo,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_factor()?;
            left = ast::Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// factor = identifier [( args )] | number | ( expression ) | - factor
    fn parse_factor(&mut self) -> Result<ast::Expression, CompileError> {
        match self.current.kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance()?;
                if self.consume(&TokenKind::LParen)? {
                    let args = self.parse_arguments()?;
                    Ok(ast::Expression::Call { name, args })
                } else {
                    Ok(ast::Expression::Variable(name))
                }
            }
            TokenKind::Number(value) => {
                self.advance()?;
                Ok(ast::Expression::Number(value))
            }
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Minus => {
                self.advance()?;
                let operand = self.parse_factor()?;
                Ok(ast::Expression::Negate(Box::new(operand)))
            }
            _ => Err(self.unexpected("a number, variable, call or '('")),
        }
    }

    /// Arguments after the opening parenthesis, through the closing one.
    fn parse_arguments(&mut self) -> Result<Vec<ast::Expression>, CompileError> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expression()?);
            while self.consume(&TokenKind::Comma)? {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RParen, "')' after arguments")?;
        Ok(args)
    }

    // Helpers

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn advance(&mut self) -> Result<Token, CompileError> {
        let span = self.current.span;
        let next = if self.check(&TokenKind::Eof) {
            self.current.clone()
        } else {
            Self::pull(&mut self.tokens, span)?
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn consume(&mut self, kind: &TokenKind) -> Result<bool, CompileError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, CompileError> {
        if self.check(&kind) {
            self.advance()
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current.kind.to_string(),
            span: self.current.span,
        }
        .into()
    }
}

/// Checks name uniqueness and call arity across the whole program.
fn validate(program: &ast::Program) -> Result<(), ParseError> {
    check_unique(program.variables.iter(), "the global VAR list")?;

    let mut arities = HashMap::new();
    for procedure in &program.procedures {
        if arities
            .insert(procedure.name.as_str(), procedure.params.len())
            .is_some()
        {
            return Err(ParseError::DuplicateProcedure {
                name: procedure.name.clone(),
            });
        }
    }

    for procedure in &program.procedures {
        let names = std::iter::once(&procedure.name)
            .chain(&procedure.params)
            .chain(&procedure.locals);
        check_unique(names, &format!("procedure '{}'", procedure.name))?;
        check_statement(&procedure.body, &arities)?;
    }

    check_statement(&program.statement, &arities)
}

fn check_unique<'a>(
    names: impl Iterator<Item = &'a String>,
    scope: &str,
) -> Result<(), ParseError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ParseError::DuplicateName {
                name: name.clone(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

fn check_statement(
    statement: &ast::Statement,
    arities: &HashMap<&str, usize>,
) -> Result<(), ParseError> {
    match statement {
        ast::Statement::Block(statements) => statements
            .iter()
            .try_for_each(|statement| check_statement(statement, arities)),
        ast::Statement::Assign { value, .. } | ast::Statement::Writeln(value) => {
            check_expression(value, arities)
        }
        ast::Statement::If { condition, body } | ast::Statement::While { condition, body } => {
            check_expression(&condition.left, arities)?;
            check_expression(&condition.right, arities)?;
            check_statement(body, arities)
        }
        ast::Statement::Readln(_) => Ok(()),
    }
}

fn check_expression(
    expression: &ast::Expression,
    arities: &HashMap<&str, usize>,
) -> Result<(), ParseError> {
    match expression {
        ast::Expression::Number(_) | ast::Expression::Variable(_) => Ok(()),
        ast::Expression::Negate(operand) => check_expression(operand, arities),
        ast::Expression::BinaryOp { left, right, .. } => {
            check_expression(left, arities)?;
            check_expression(right, arities)
        }
        ast::Expression::Call { name, args } => {
            if let Some(&expected) = arities.get(name.as_str())
                && expected != args.len()
            {
                return Err(ParseError::ArityMismatch {
                    name: name.clone(),
                    expected,
                    found: args.len(),
                });
            }
            args.iter()
                .try_for_each(|arg| check_expression(arg, arities))
        }
    }
}

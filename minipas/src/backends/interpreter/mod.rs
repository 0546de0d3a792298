mod environment;
mod input;

pub use environment::Environment;
pub use input::{InputSource, LineInput};

use std::io::Write;

use super::Backend;
use crate::error::{CompileError, RuntimeError};
use crate::ir::ast;

/// Tree-walking interpreter.
///
/// WRITELN output goes to `out` one line at a time; READLN values come from
/// `input`.
pub struct Interpreter<W, R> {
    out: W,
    input: R,
}

impl<W: Write, R: InputSource> Backend for Interpreter<W, R> {
    type Output = ();

    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn run(&mut self, program: &ast::Program) -> Result<(), CompileError> {
        self.execute(program)
    }
}

impl<W: Write, R: InputSource> Interpreter<W, R> {
    pub fn new(out: W, input: R) -> Self {
        Self { out, input }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn execute(&mut self, program: &ast::Program) -> Result<(), CompileError> {
        let mut env = Environment::new();
        for name in &program.variables {
            env.declare(name, 0);
        }
        for procedure in &program.procedures {
            env.define_procedure(procedure);
        }
        self.exec_statement(&program.statement, &mut env)
    }

    fn exec_statement(
        &mut self,
        statement: &ast::Statement,
        env: &mut Environment<'_>,
    ) -> Result<(), CompileError> {
        match statement {
            ast::Statement::Block(statements) => {
                for statement in statements {
                    self.exec_statement(statement, env)?;
                }
            }
            ast::Statement::Assign { target, value } => {
                let value = self.eval(value, env)?;
                env.set(target, value);
            }
            ast::Statement::If { condition, body } => {
                if self.check(condition, env)? {
                    self.exec_statement(body, env)?;
                }
            }
            ast::Statement::While { condition, body } => {
                while self.check(condition, env)? {
                    self.exec_statement(body, env)?;
                }
            }
            ast::Statement::Writeln(value) => {
                let value = self.eval(value, env)?;
                writeln!(self.out, "{value}")?;
                self.out.flush()?;
            }
            ast::Statement::Readln(target) => {
                let value = self.input.read_integer()?;
                env.set(target, value);
            }
        }
        Ok(())
    }

    fn check(
        &mut self,
        condition: &ast::Condition,
        env: &mut Environment<'_>,
    ) -> Result<bool, CompileError> {
        let left = self.eval(&condition.left, env)?;
        let right = self.eval(&condition.right, env)?;
        Ok(condition.op.holds(left, right))
    }

    fn eval(
        &mut self,
        expression: &ast::Expression,
        env: &mut Environment<'_>,
    ) -> Result<i32, CompileError> {
        match expression {
            ast::Expression::Number(value) => Ok(*value),
            ast::Expression::Variable(name) => Ok(env.get(name)?),
            ast::Expression::Negate(operand) => Ok(self.eval(operand, env)?.wrapping_neg()),
            ast::Expression::BinaryOp { left, op, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                Ok(apply(*op, left, right)?)
            }
            ast::Expression::Call { name, args } => self.call(name, args, env),
        }
    }

    fn call(
        &mut self,
        name: &str,
        args: &[ast::Expression],
        env: &mut Environment<'_>,
    ) -> Result<i32, CompileError> {
        let procedure = env.procedure(name)?;
        if procedure.params.len() != args.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: procedure.params.len(),
                found: args.len(),
            }
            .into());
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, env)?);
        }

        env.push_scope();
        env.declare(&procedure.name, 0);
        for (param, value) in procedure.params.iter().zip(values) {
            env.declare(param, value);
        }
        for local in &procedure.locals {
            env.declare(local, 0);
        }

        let outcome = self.exec_statement(&procedure.body, env);
        let value = env.get(&procedure.name);
        env.pop_scope();
        outcome?;
        Ok(value?)
    }
}

fn apply(op: ast::BinaryOperator, left: i32, right: i32) -> Result<i32, RuntimeError> {
    let value = match op {
        ast::BinaryOperator::Add => left.wrapping_add(right),
        ast::BinaryOperator::Subtract => left.wrapping_sub(right),
        ast::BinaryOperator::Multiply => left.wrapping_mul(right),
        ast::BinaryOperator::Divide => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            left.wrapping_div(right)
        }
        ast::BinaryOperator::Modulo => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            left.wrapping_rem(right)
        }
    };
    Ok(value)
}

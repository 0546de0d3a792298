mod frame;

pub use frame::{Context, Frame, Location, WORD};

use std::collections::HashSet;
use std::fmt::Write;

use super::Backend;
use crate::error::{CodegenError, CompileError};
use crate::ir::ast;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MipsConfig {
    /// Emit `#` comment lines describing assignments, calls and frames.
    pub annotate: bool,
}

/// Stack-machine code generator targeting MIPS32 assembly.
///
/// Every expression leaves its value in `$v0`; intermediate values live on
/// the stack. Globals are `.word` cells labelled `var<name>`, procedures are
/// labelled `proc<name>`.
#[derive(Debug, Default)]
pub struct MipsBackend {
    config: MipsConfig,
    text: String,
    labels: usize,
    declared: HashSet<String>,
    implicit: Vec<String>,
}

impl Backend for MipsBackend {
    type Output = String;

    fn name(&self) -> &'static str {
        "mips"
    }

    fn run(&mut self, program: &ast::Program) -> Result<String, CompileError> {
        Ok(self.compile_program(program)?)
    }
}

impl MipsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MipsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn compile_program(&mut self, program: &ast::Program) -> Result<String, CodegenError> {
        self.text.clear();
        self.labels = 0;
        self.implicit.clear();
        self.declared = program.variables.iter().cloned().collect();

        let mut context = Context::Global;

        self.emit_label("main")?;
        self.compile_statement(program, &program.statement, &mut context)?;
        self.emit_instruction("la $a0, newline")?;
        self.emit_instruction("li $v0, 4")?;
        self.emit_instruction("syscall")?;
        self.emit_instruction("li $v0, 10")?;
        self.emit_instruction("syscall")?;

        for procedure in &program.procedures {
            self.compile_procedure(program, procedure)?;
        }

        let mut out = String::new();
        writeln!(out, "\t.data")?;
        writeln!(out, "newline:\t.asciiz \"\\n\"")?;
        for name in program.variables.iter().chain(&self.implicit) {
            writeln!(out, "var{name}:\t.word 0")?;
        }
        writeln!(out, "\t.text")?;
        writeln!(out, "\t.globl main")?;
        out.push_str(&self.text);
        Ok(out)
    }

    fn compile_procedure(
        &mut self,
        program: &ast::Program,
        procedure: &ast::ProcedureDeclaration,
    ) -> Result<(), CodegenError> {
        self.emit_label(&format!("proc{}", procedure.name))?;
        self.annotate(&format!("prologue {}", procedure.name))?;

        let mut context = Context::Global;
        for _ in &procedure.locals {
            self.emit_instruction("li $v0, 0")?;
            self.push("$v0", &mut context)?;
        }

        context = Context::Procedure(Frame::new(procedure));
        self.compile_statement(program, &procedure.body, &mut context)?;
        context = Context::Global;

        self.annotate(&format!("epilogue {}", procedure.name))?;
        for _ in &procedure.locals {
            self.pop("$t0", &mut context)?;
        }
        self.pop("$v0", &mut context)?;
        self.emit_instruction("jr $ra")
    }

    fn compile_statement(
        &mut self,
        program: &ast::Program,
        statement: &ast::Statement,
        context: &mut Context<'_>,
    ) -> Result<(), CodegenError> {
        match statement {
            ast::Statement::Block(statements) => {
                for statement in statements {
                    self.compile_statement(program, statement, context)?;
                }
            }
            ast::Statement::Assign { target, value } => {
                self.annotate(&format!("{target} := ..."))?;
                self.compile_expression(program, value, context)?;
                self.store(target, context)?;
            }
            ast::Statement::If { condition, body } => {
                let label = format!("endif{}", self.next_label());
                self.compile_condition(program, condition, &label, context)?;
                self.compile_statement(program, body, context)?;
                self.emit_label(&label)?;
            }
            ast::Statement::While { condition, body } => {
                let n = self.next_label();
                let top = format!("while{n}");
                let exit = format!("endwhile{n}");
                self.emit_label(&top)?;
                self.compile_condition(program, condition, &exit, context)?;
                self.compile_statement(program, body, context)?;
                self.emit_instruction(&format!("j {top}"))?;
                self.emit_label(&exit)?;
            }
            ast::Statement::Writeln(value) => {
                self.compile_expression(program, value, context)?;
                self.emit_instruction("move $a0, $v0")?;
                self.emit_instruction("li $v0, 1")?;
                self.emit_instruction("syscall")?;
                self.emit_instruction("la $a0, newline")?;
                self.emit_instruction("li $v0, 4")?;
                self.emit_instruction("syscall")?;
            }
            ast::Statement::Readln(target) => {
                self.emit_instruction("li $v0, 5")?;
                self.emit_instruction("syscall")?;
                self.store(target, context)?;
            }
        }
        debug_assert_eq!(context.excess(), 0, "unbalanced stack after statement");
        Ok(())
    }

    /// Jumps to `label` when the condition does not hold.
    fn compile_condition(
        &mut self,
        program: &ast::Program,
        condition: &ast::Condition,
        label: &str,
        context: &mut Context<'_>,
    ) -> Result<(), CodegenError> {
        self.compile_expression(program, &condition.left, context)?;
        self.push("$v0", context)?;
        self.compile_expression(program, &condition.right, context)?;
        self.pop("$t0", context)?;
        let branch = branch_mnemonic(condition.op.negated());
        self.emit_instruction(&format!("{branch} $t0, $v0, {label}"))
    }

    fn compile_expression(
        &mut self,
        program: &ast::Program,
        expression: &ast::Expression,
        context: &mut Context<'_>,
    ) -> Result<(), CodegenError> {
        match expression {
            ast::Expression::Number(value) => self.emit_instruction(&format!("li $v0, {value}")),
            ast::Expression::Variable(name) => {
                let location = self.resolve(name, context);
                self.emit_instruction(&format!("lw $v0, {location}"))
            }
            ast::Expression::Negate(operand) => {
                self.compile_expression(program, operand, context)?;
                self.emit_instruction("subu $v0, $zero, $v0")
            }
            ast::Expression::BinaryOp { left, op, right } => {
                self.compile_expression(program, left, context)?;
                self.push("$v0", context)?;
                self.compile_expression(program, right, context)?;
                self.pop("$t0", context)?;
                match op {
                    ast::BinaryOperator::Add => self.emit_instruction("addu $v0, $t0, $v0"),
                    ast::BinaryOperator::Subtract => self.emit_instruction("subu $v0, $t0, $v0"),
                    ast::BinaryOperator::Multiply => {
                        self.emit_instruction("mult $t0, $v0")?;
                        self.emit_instruction("mflo $v0")
                    }
                    ast::BinaryOperator::Divide => {
                        self.emit_instruction("div $t0, $v0")?;
                        self.emit_instruction("mflo $v0")
                    }
                    ast::BinaryOperator::Modulo => {
                        self.emit_instruction("div $t0, $v0")?;
                        self.emit_instruction("mfhi $v0")
                    }
                }
            }
            ast::Expression::Call { name, args } => {
                self.compile_call(program, name, args, context)
            }
        }
    }

    fn compile_call(
        &mut self,
        program: &ast::Program,
        name: &str,
        args: &[ast::Expression],
        context: &mut Context<'_>,
    ) -> Result<(), CodegenError> {
        if program.procedure(name).is_none() {
            return Err(CodegenError::UndefinedProcedure {
                name: name.to_string(),
            });
        }

        self.annotate(&format!("call {name}"))?;
        self.push("$ra", context)?;
        for arg in args {
            self.compile_expression(program, arg, context)?;
            self.push("$v0", context)?;
        }
        self.emit_instruction("li $v0, 0")?;
        self.push("$v0", context)?;
        self.emit_instruction(&format!("jal proc{name}"))?;
        context.callee_popped();

        for _ in args {
            self.pop("$t0", context)?;
        }
        self.pop("$ra", context)?;
        self.annotate(&format!("return from {name}"))
    }

    fn store(&mut self, target: &str, context: &Context<'_>) -> Result<(), CodegenError> {
        let location = self.resolve(target, context);
        self.emit_instruction(&format!("sw $v0, {location}"))
    }

    /// Locates `name`, reserving a data cell for undeclared globals.
    fn resolve(&mut self, name: &str, context: &Context<'_>) -> Location {
        let location = context.locate(name);
        if let Location::Global(global) = &location
            && !self.declared.contains(global)
        {
            self.declared.insert(global.clone());
            self.implicit.push(global.clone());
        }
        location
    }

    fn push(&mut self, register: &str, context: &mut Context<'_>) -> Result<(), CodegenError> {
        self.emit_instruction(&format!("subu $sp, $sp, {WORD}"))?;
        self.emit_instruction(&format!("sw {register}, ($sp)"))?;
        context.push();
        Ok(())
    }

    fn pop(&mut self, register: &str, context: &mut Context<'_>) -> Result<(), CodegenError> {
        self.emit_instruction(&format!("lw {register}, ($sp)"))?;
        self.emit_instruction(&format!("addu $sp, $sp, {WORD}"))?;
        context.pop();
        Ok(())
    }

    fn next_label(&mut self) -> usize {
        let label = self.labels;
        self.labels += 1;
        label
    }

    fn emit_instruction(&mut self, instruction: &str) -> Result<(), CodegenError> {
        writeln!(self.text, "\t{instruction}")?;
        Ok(())
    }

    fn emit_label(&mut self, label: &str) -> Result<(), CodegenError> {
        writeln!(self.text, "{label}:")?;
        Ok(())
    }

    fn annotate(&mut self, note: &str) -> Result<(), CodegenError> {
        if self.config.annotate {
            writeln!(self.text, "\t# {note}")?;
        }
        Ok(())
    }
}

/// Branch taken when `op` holds for `$t0 op $v0`.
fn branch_mnemonic(op: ast::RelationalOperator) -> &'static str {
    match op {
        ast::RelationalOperator::Less => "blt",
        ast::RelationalOperator::Greater => "bgt",
        ast::RelationalOperator::LessEqual => "ble",
        ast::RelationalOperator::GreaterEqual => "bge",
        ast::RelationalOperator::Equal => "beq",
        ast::RelationalOperator::NotEqual => "bne",
    }
}

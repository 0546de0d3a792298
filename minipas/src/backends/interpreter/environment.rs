use std::collections::HashMap;

use crate::error::RuntimeError;
use crate::ir::ast::ProcedureDeclaration;

/// Scope chain for the interpreter.
///
/// `scopes[0]` is the global scope; the last entry is the innermost one.
/// Lookups walk from the innermost scope outward. The procedure table belongs
/// to the global scope and is never shadowed.
#[derive(Debug)]
pub struct Environment<'a> {
    scopes: Vec<HashMap<String, i32>>,
    procedures: HashMap<&'a str, &'a ProcedureDeclaration>,
}

impl Default for Environment<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            procedures: HashMap::new(),
        }
    }

    /// Number of scopes in the chain, the global one included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Drops the innermost scope. The global scope is never removed.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Binds `name` in the innermost scope, replacing any binding already there.
    pub fn declare(&mut self, name: &str, value: i32) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    pub fn get(&self, name: &str) -> Result<i32, RuntimeError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Updates the nearest existing binding of `name`.
    ///
    /// A name bound nowhere in the chain is created in the global scope.
    pub fn set(&mut self, name: &str, value: i32) {
        if let Some(slot) = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
        {
            *slot = value;
        } else {
            self.scopes[0].insert(name.to_string(), value);
        }
    }

    pub fn define_procedure(&mut self, procedure: &'a ProcedureDeclaration) {
        self.procedures.insert(procedure.name.as_str(), procedure);
    }

    pub fn procedure(&self, name: &str) -> Result<&'a ProcedureDeclaration, RuntimeError> {
        self.procedures
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedProcedure {
                name: name.to_string(),
            })
    }
}

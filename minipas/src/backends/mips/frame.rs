use std::fmt;

use crate::ir::ast::ProcedureDeclaration;

/// Word size on the target, in bytes.
pub const WORD: usize = 4;

/// Stack layout of the procedure currently being generated.
///
/// On entry to the body, the stack holds (top first): the locals, the return
/// slot, the arguments in reverse order and the caller's `$ra`. `excess` counts
/// the scratch words pushed on top of that while evaluating expressions, so
/// every offset shifts by one word per pending push.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    decl: &'a ProcedureDeclaration,
    excess: usize,
}

impl<'a> Frame<'a> {
    pub fn new(decl: &'a ProcedureDeclaration) -> Self {
        Self { decl, excess: 0 }
    }

    pub fn excess(&self) -> usize {
        self.excess
    }

    pub fn push(&mut self) {
        self.excess += 1;
    }

    pub fn pop(&mut self) {
        debug_assert!(self.excess > 0, "pop below the frame base");
        self.excess = self.excess.saturating_sub(1);
    }

    /// `$sp`-relative byte offset of `name`, or `None` when the name is not
    /// part of this frame and must be addressed as a global.
    pub fn slot(&self, name: &str) -> Option<usize> {
        let base = WORD * self.excess;
        let locals = self.decl.locals.len();
        let params = self.decl.params.len();

        if name == self.decl.name {
            return Some(base + WORD * locals);
        }
        if let Some(i) = self.decl.locals.iter().position(|local| local == name) {
            return Some(base + WORD * i);
        }
        self.decl
            .params
            .iter()
            .position(|param| param == name)
            .map(|i| base + WORD * locals + WORD + WORD * (params - 1 - i))
    }
}

/// Where generated code currently lives.
#[derive(Debug, Clone)]
pub enum Context<'a> {
    Global,
    Procedure(Frame<'a>),
}

impl Context<'_> {
    /// Records a scratch push. Only procedure frames track height.
    pub fn push(&mut self) {
        if let Context::Procedure(frame) = self {
            frame.push();
        }
    }

    pub fn pop(&mut self) {
        if let Context::Procedure(frame) = self {
            frame.pop();
        }
    }

    /// The callee consumed the return slot the caller pushed.
    pub fn callee_popped(&mut self) {
        self.pop();
    }

    pub fn excess(&self) -> usize {
        match self {
            Context::Global => 0,
            Context::Procedure(frame) => frame.excess(),
        }
    }

    pub fn locate(&self, name: &str) -> Location {
        match self {
            Context::Procedure(frame) => frame
                .slot(name)
                .map_or_else(|| Location::Global(name.to_string()), Location::Stack),
            Context::Global => Location::Global(name.to_string()),
        }
    }
}

/// Operand form of a variable access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Global(String),
    Stack(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Global(name) => write!(f, "var{name}"),
            Location::Stack(offset) => write!(f, "{offset}($sp)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::{Expression, Statement};

    fn declaration(params: &[&str], locals: &[&str]) -> ProcedureDeclaration {
        ProcedureDeclaration {
            name: "p".to_string(),
            params: params.iter().map(|s| s.to_string()).collect(),
            locals: locals.iter().map(|s| s.to_string()).collect(),
            body: Statement::Writeln(Expression::Number(0)),
        }
    }

    #[test]
    fn offsets_without_excess() {
        let decl = declaration(&["a", "b", "c"], &["x", "y"]);
        let frame = Frame::new(&decl);
        assert_eq!(frame.slot("x"), Some(0));
        assert_eq!(frame.slot("y"), Some(4));
        assert_eq!(frame.slot("p"), Some(8));
        assert_eq!(frame.slot("c"), Some(12));
        assert_eq!(frame.slot("b"), Some(16));
        assert_eq!(frame.slot("a"), Some(20));
        assert_eq!(frame.slot("g"), None);
    }

    #[test]
    fn pushes_shift_every_offset() {
        let decl = declaration(&["a"], &[]);
        let mut frame = Frame::new(&decl);
        frame.push();
        frame.push();
        assert_eq!(frame.slot("p"), Some(8));
        assert_eq!(frame.slot("a"), Some(12));
        frame.pop();
        assert_eq!(frame.slot("p"), Some(4));
        assert_eq!(frame.excess(), 1);
    }

    #[test]
    fn global_context_ignores_height() {
        let mut context = Context::Global;
        context.push();
        context.push();
        assert_eq!(context.excess(), 0);
        assert_eq!(context.locate("p"), Location::Global("p".to_string()));
    }

    #[test]
    fn procedure_context_falls_back_to_globals() {
        let decl = declaration(&["a"], &["t"]);
        let mut context = Context::Procedure(Frame::new(&decl));
        context.push();
        assert_eq!(context.locate("t"), Location::Stack(4));
        assert_eq!(context.locate("total"), Location::Global("total".to_string()));
        assert_eq!(context.locate("t").to_string(), "4($sp)");
        assert_eq!(context.locate("total").to_string(), "vartotal");
    }

    #[test]
    fn call_sequence_leaves_height_balanced() {
        let decl = declaration(&[], &[]);
        let mut context = Context::Procedure(Frame::new(&decl));
        // $ra, two arguments, return slot
        for _ in 0..4 {
            context.push();
        }
        context.callee_popped();
        for _ in 0..3 {
            context.pop();
        }
        assert_eq!(context.excess(), 0);
    }
}

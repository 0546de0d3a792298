use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Names from the top-level `VAR` list, in declaration order
    pub variables: Vec<String>,
    pub procedures: Vec<ProcedureDeclaration>,
    pub statement: Statement,
}

impl Program {
    pub fn procedure(&self, name: &str) -> Option<&ProcedureDeclaration> {
        self.procedures.iter().find(|procedure| procedure.name == name)
    }
}

/// `PROCEDURE name(params); VAR locals; body`
///
/// Inside the body the procedure's own name is a variable: the return slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDeclaration {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub body: Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// BEGIN ... END
    Block(Vec<Statement>),
    /// x := expression
    Assign { target: String, value: Expression },
    /// IF condition THEN statement
    If {
        condition: Condition,
        body: Box<Statement>,
    },
    /// WHILE condition DO statement
    While {
        condition: Condition,
        body: Box<Statement>,
    },
    /// WRITELN(expression)
    Writeln(Expression),
    /// READLN(x)
    Readln(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(i32),
    Variable(String),
    /// -factor
    Negate(Box<Expression>),
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// f(a, b)
    Call { name: String, args: Vec<Expression> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // mod
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Expression,
    pub op: RelationalOperator,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalOperator {
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl RelationalOperator {
    pub fn holds(self, left: i32, right: i32) -> bool {
        match self {
            Self::Less => left < right,
            Self::Greater => left > right,
            Self::LessEqual => left <= right,
            Self::GreaterEqual => left >= right,
            Self::Equal => left == right,
            Self::NotEqual => left != right,
        }
    }

    /// The operator that holds exactly when `self` does not.
    pub fn negated(self) -> Self {
        match self {
            Self::Less => Self::GreaterEqual,
            Self::Greater => Self::LessEqual,
            Self::LessEqual => Self::Greater,
            Self::GreaterEqual => Self::Less,
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
        }
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Equal => "=",
            Self::NotEqual => "<>",
        })
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "mod",
        })
    }
}

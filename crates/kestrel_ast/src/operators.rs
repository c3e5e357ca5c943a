//! Operator vocabulary of `Operation` nodes.

use std::fmt;

/// Every operator the language defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
    Neg,
    Inc,
    Dec,
}

/// How an operator is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Arithmetic,
    Relational,
    Equality,
    Logical,
    /// Unary `-`, `++` and `--`.
    UnaryArithmetic,
}

impl Operator {
    /// Resolve an operator symbol for the given operand count. `-` is
    /// subtraction with two operands and negation with one.
    pub fn parse(symbol: &str, arity: usize) -> Option<Operator> {
        let op = match (symbol, arity) {
            ("+", 2) => Operator::Add,
            ("-", 2) => Operator::Sub,
            ("*", 2) => Operator::Mul,
            ("/", 2) => Operator::Div,
            ("//", 2) => Operator::IntDiv,
            ("%", 2) => Operator::Mod,
            ("^", 2) => Operator::Pow,
            ("<", 2) => Operator::Lt,
            ("<=", 2) => Operator::Le,
            (">", 2) => Operator::Gt,
            (">=", 2) => Operator::Ge,
            ("==", 2) => Operator::Eq,
            ("!=", 2) => Operator::Ne,
            ("AND", 2) => Operator::And,
            ("OR", 2) => Operator::Or,
            ("NOT", 1) => Operator::Not,
            ("-", 1) => Operator::Neg,
            ("++", 1) => Operator::Inc,
            ("--", 1) => Operator::Dec,
            _ => return None,
        };
        Some(op)
    }

    pub fn class(self) -> OperatorClass {
        match self {
            Operator::Add
            | Operator::Sub
            | Operator::Mul
            | Operator::Div
            | Operator::IntDiv
            | Operator::Mod
            | Operator::Pow => OperatorClass::Arithmetic,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => OperatorClass::Relational,
            Operator::Eq | Operator::Ne => OperatorClass::Equality,
            Operator::And | Operator::Or | Operator::Not => OperatorClass::Logical,
            Operator::Neg | Operator::Inc | Operator::Dec => OperatorClass::UnaryArithmetic,
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Operator::Not | Operator::Neg | Operator::Inc | Operator::Dec)
    }

    /// `++` and `--`, which write back to their operand.
    pub fn is_step(self) -> bool {
        matches!(self, Operator::Inc | Operator::Dec)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub | Operator::Neg => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::IntDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "^",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Inc => "++",
            Operator::Dec => "--",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

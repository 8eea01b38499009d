//! Syntax tree of the read-only expression language. Every node the parser
//! can produce is safe to evaluate except `Call`, which the condition policy
//! rejects statically and the evaluator refuses at runtime.

use itertools::Itertools;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Undefined => f.write_str("undefined"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "===")]
    StrictEq,
    #[strum(serialize = "!==")]
    StrictNe,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    This,
    Ident(String),
    /// `a.b`
    Member(Box<Expr>, String),
    /// `a[i]`
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `c ? t : f`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `a, b, c` — evaluates left to right, yields the last.
    Comma(Vec<Expr>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    /// Syntactically valid, never executed by the agent.
    Call(Box<Expr>, Vec<Expr>),
}

impl Expr {
    /// True when any node in the tree is a call expression.
    pub fn contains_call(&self) -> bool {
        match self {
            Expr::Call(_, _) => true,
            Expr::Literal(_) | Expr::This | Expr::Ident(_) => false,
            Expr::Member(e, _) | Expr::Unary(_, e) => e.contains_call(),
            Expr::Index(a, b) | Expr::Binary(_, a, b) => a.contains_call() || b.contains_call(),
            Expr::Conditional(c, t, f) => {
                c.contains_call() || t.contains_call() || f.contains_call()
            }
            Expr::Comma(items) | Expr::Array(items) => items.iter().any(Expr::contains_call),
            Expr::Object(pairs) => pairs.iter().any(|(_, e)| e.contains_call()),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::This => f.write_str("this"),
            Expr::Ident(name) => f.write_str(name),
            Expr::Member(e, field) => write!(f, "{e}.{field}"),
            Expr::Index(e, idx) => write!(f, "{e}[{idx}]"),
            Expr::Unary(op, e) => write!(f, "{op}{e}"),
            Expr::Binary(op, a, b) => write!(f, "({a} {op} {b})"),
            Expr::Conditional(c, t, e) => write!(f, "({c} ? {t} : {e})"),
            Expr::Comma(items) => f.write_str(&items.iter().map(Expr::to_string).join(", ")),
            Expr::Array(items) => {
                write!(f, "[{}]", items.iter().map(Expr::to_string).join(", "))
            }
            Expr::Object(pairs) => {
                let body = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .join(", ");
                write!(f, "{{{body}}}")
            }
            Expr::Call(callee, args) => {
                write!(f, "{callee}({})", args.iter().map(Expr::to_string).join(", "))
            }
        }
    }
}

//! Expression nodes.
//! 表达式节点。

use crate::{Block, Name, TypeExpr};
use tarn_common::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),

    Ident(String),

    /// `(a, b, c)`
    Tuple(Vec<Expr>),
    /// `[a, b, c]`
    Array(Vec<Expr>),

    /// `Point { x: 1, y: 2 }` or `Shape::Circle { radius: 1.0 }`
    Construct {
        ty: Name,
        tag: Option<Name>,
        fields: Vec<(Name, Expr)>,
    },

    /// `p:x` or `t:0`
    Field { target: Box<Expr>, field: FieldRef },

    Call { callee: Box<Expr>, args: Vec<Expr> },

    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Anonymous function. Parameter annotations are optional; the type
    /// comes from the context the closure is passed into.
    Closure {
        params: Vec<ClosureParam>,
        body: Block,
    },

    /// `if c1 { .. } else if c2 { .. } else { .. }`
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },

    Match { target: Box<Expr>, cases: Vec<MatchCase> },

    /// `do { ... }`
    Do(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    Name(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureParam {
    pub name: Name,
    pub ty: Option<TypeExpr>,
}

/// `Circle { radius: r } => { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub tag: Name,
    pub bindings: Vec<CaseBinding>,
    pub body: Block,
    pub span: Span,
}

/// Binds the payload field `field` to the local name `binding`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBinding {
    pub field: Name,
    pub binding: Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    /// The name the operator is bound to in the built-in environment.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "neg",
        }
    }
}

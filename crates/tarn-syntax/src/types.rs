//! Type expression nodes.
//! 类型表达式节点。

use tarn_common::Span;

/// A type as written in an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `Int`, `T`, `Option<Int>`
    Ident { name: String, args: Vec<TypeExpr> },
    /// `(Int, String)`
    Tuple(Vec<TypeExpr>),
    /// `Func(Int, Int): Bool`
    Func {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    /// `[Int; 3]`
    Array { elem: Box<TypeExpr>, size: usize },
}

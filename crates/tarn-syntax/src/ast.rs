//! Statements and declarations.
//! 语句与声明。

use crate::{Expr, Name, TypeExpr};
use tarn_common::Span;

/// A whole program: top-level statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

/// A braced sequence of statements. Its value is the trailing expression
/// statement, if there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `let x: T = value` or `let (a, b) = value`
    Let {
        pattern: LetPattern,
        ty: Option<TypeExpr>,
        value: Expr,
    },
    Func(FuncDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Trait(TraitDecl),
    Impl(ImplDecl),
    Return(Option<Expr>),
    While {
        cond: Expr,
        body: Block,
    },
    /// `for x in array { ... }`
    For {
        name: Name,
        iterable: Expr,
        body: Block,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LetPattern {
    Name(Name),
    Tuple(Vec<Name>),
}

/// `T` or `T: Num + Eq` in a declaration's type parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParam {
    pub name: Name,
    pub bounds: Vec<Name>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Name,
    pub generics: Vec<GenericParam>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: Name,
    pub generics: Vec<GenericParam>,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Name,
    pub generics: Vec<GenericParam>,
    pub tags: Vec<TagDecl>,
}

/// One enum case: `Empty` or `Circle { radius: Float }`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDecl {
    pub name: Name,
    pub fields: Vec<FieldDecl>,
}

/// `trait Show { show(Self): String }`
#[derive(Debug, Clone, PartialEq)]
pub struct TraitDecl {
    pub name: Name,
    pub methods: Vec<MethodSig>,
}

/// A trait method signature. `Self` names the implementing type.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    pub name: Name,
    pub params: Vec<TypeExpr>,
    pub ret: TypeExpr,
}

/// `impl Show for Point { func show(p: Point): String { ... } }`
#[derive(Debug, Clone, PartialEq)]
pub struct ImplDecl {
    pub trait_name: Name,
    pub ty: TypeExpr,
    pub methods: Vec<FuncDecl>,
}

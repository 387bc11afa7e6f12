//! Terse constructors for syntax trees.
//!
//! Every node gets [`Span::DUMMY`]. Used by tests and by tools that
//! synthesize programs without going through the parser.

use crate::*;
use tarn_common::{Span, Spanned};

pub fn name(s: &str) -> Name {
    Spanned::new(s.to_string(), Span::DUMMY)
}

pub fn program(stmts: Vec<Stmt>) -> Program {
    Program { stmts }
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block::new(stmts, Span::DUMMY)
}

// --- types ---

pub fn ty(name: &str) -> TypeExpr {
    ty_args(name, vec![])
}

pub fn ty_args(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::new(
        TypeExprKind::Ident {
            name: name.to_string(),
            args,
        },
        Span::DUMMY,
    )
}

pub fn tuple_ty(elems: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::new(TypeExprKind::Tuple(elems), Span::DUMMY)
}

pub fn func_ty(params: Vec<TypeExpr>, ret: TypeExpr) -> TypeExpr {
    TypeExpr::new(
        TypeExprKind::Func {
            params,
            ret: Box::new(ret),
        },
        Span::DUMMY,
    )
}

pub fn array_ty(elem: TypeExpr, size: usize) -> TypeExpr {
    TypeExpr::new(
        TypeExprKind::Array {
            elem: Box::new(elem),
            size,
        },
        Span::DUMMY,
    )
}

// --- expressions ---

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::DUMMY)
}

pub fn int(n: i64) -> Expr {
    expr(ExprKind::Int(n))
}

pub fn float(n: f64) -> Expr {
    expr(ExprKind::Float(n))
}

pub fn string(s: &str) -> Expr {
    expr(ExprKind::Str(s.to_string()))
}

pub fn boolean(b: bool) -> Expr {
    expr(ExprKind::Bool(b))
}

pub fn ident(s: &str) -> Expr {
    expr(ExprKind::Ident(s.to_string()))
}

pub fn tuple(elems: Vec<Expr>) -> Expr {
    expr(ExprKind::Tuple(elems))
}

pub fn array(elems: Vec<Expr>) -> Expr {
    expr(ExprKind::Array(elems))
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        args,
    })
}

pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn field(target: Expr, field: &str) -> Expr {
    expr(ExprKind::Field {
        target: Box::new(target),
        field: FieldRef::Name(field.to_string()),
    })
}

pub fn index(target: Expr, index: usize) -> Expr {
    expr(ExprKind::Field {
        target: Box::new(target),
        field: FieldRef::Index(index),
    })
}

pub fn construct(ty: &str, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::Construct {
        ty: name(ty),
        tag: None,
        fields: fields.into_iter().map(|(n, e)| (name(n), e)).collect(),
    })
}

pub fn construct_tag(ty: &str, tag: &str, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::Construct {
        ty: name(ty),
        tag: Some(name(tag)),
        fields: fields.into_iter().map(|(n, e)| (name(n), e)).collect(),
    })
}

/// A closure whose parameters take their types from context.
pub fn closure(params: &[&str], body: Block) -> Expr {
    expr(ExprKind::Closure {
        params: params
            .iter()
            .map(|p| ClosureParam {
                name: name(p),
                ty: None,
            })
            .collect(),
        body,
    })
}

pub fn if_else(cond: Expr, then: Block, otherwise: Option<Block>) -> Expr {
    expr(ExprKind::If {
        branches: vec![(cond, then)],
        else_block: otherwise,
    })
}

pub fn match_on(target: Expr, cases: Vec<MatchCase>) -> Expr {
    expr(ExprKind::Match {
        target: Box::new(target),
        cases,
    })
}

/// `tag { field: binding, .. } => body`
pub fn case(tag: &str, bindings: &[(&str, &str)], body: Block) -> MatchCase {
    MatchCase {
        tag: name(tag),
        bindings: bindings
            .iter()
            .map(|(f, b)| CaseBinding {
                field: name(f),
                binding: name(b),
            })
            .collect(),
        body,
        span: Span::DUMMY,
    }
}

pub fn do_block(body: Block) -> Expr {
    expr(ExprKind::Do(body))
}

// --- statements ---

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::DUMMY)
}

pub fn let_(n: &str, value: Expr) -> Stmt {
    stmt(StmtKind::Let {
        pattern: LetPattern::Name(name(n)),
        ty: None,
        value,
    })
}

pub fn let_typed(n: &str, ty: TypeExpr, value: Expr) -> Stmt {
    stmt(StmtKind::Let {
        pattern: LetPattern::Name(name(n)),
        ty: Some(ty),
        value,
    })
}

pub fn let_tuple(names: &[&str], value: Expr) -> Stmt {
    stmt(StmtKind::Let {
        pattern: LetPattern::Tuple(names.iter().map(|n| name(n)).collect()),
        ty: None,
        value,
    })
}

pub fn expr_stmt(e: Expr) -> Stmt {
    stmt(StmtKind::Expr(e))
}

pub fn ret(value: Option<Expr>) -> Stmt {
    stmt(StmtKind::Return(value))
}

pub fn while_loop(cond: Expr, body: Block) -> Stmt {
    stmt(StmtKind::While { cond, body })
}

pub fn for_loop(n: &str, iterable: Expr, body: Block) -> Stmt {
    stmt(StmtKind::For {
        name: name(n),
        iterable,
        body,
    })
}

pub fn generic(n: &str, bounds: &[&str]) -> GenericParam {
    GenericParam {
        name: name(n),
        bounds: bounds.iter().map(|b| name(b)).collect(),
    }
}

pub fn func(n: &str, params: Vec<(&str, TypeExpr)>, ret: Option<TypeExpr>, body: Block) -> FuncDecl {
    FuncDecl {
        name: name(n),
        generics: vec![],
        params: params
            .into_iter()
            .map(|(p, ty)| Param { name: name(p), ty })
            .collect(),
        ret,
        body,
        span: Span::DUMMY,
    }
}

impl FuncDecl {
    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }
}

impl From<FuncDecl> for Stmt {
    fn from(decl: FuncDecl) -> Self {
        let span = decl.span;
        Stmt::new(StmtKind::Func(decl), span)
    }
}

fn fields(fields: Vec<(&str, TypeExpr)>) -> Vec<FieldDecl> {
    fields
        .into_iter()
        .map(|(n, ty)| FieldDecl { name: name(n), ty })
        .collect()
}

pub fn struct_decl(n: &str, generics: Vec<GenericParam>, fs: Vec<(&str, TypeExpr)>) -> Stmt {
    stmt(StmtKind::Struct(StructDecl {
        name: name(n),
        generics,
        fields: fields(fs),
    }))
}

pub fn enum_decl(
    n: &str,
    generics: Vec<GenericParam>,
    tags: Vec<(&str, Vec<(&str, TypeExpr)>)>,
) -> Stmt {
    stmt(StmtKind::Enum(EnumDecl {
        name: name(n),
        generics,
        tags: tags
            .into_iter()
            .map(|(t, fs)| TagDecl {
                name: name(t),
                fields: fields(fs),
            })
            .collect(),
    }))
}

pub fn trait_decl(n: &str, methods: Vec<(&str, Vec<TypeExpr>, TypeExpr)>) -> Stmt {
    stmt(StmtKind::Trait(TraitDecl {
        name: name(n),
        methods: methods
            .into_iter()
            .map(|(m, params, ret)| MethodSig {
                name: name(m),
                params,
                ret,
            })
            .collect(),
    }))
}

pub fn impl_decl(trait_name: &str, ty: TypeExpr, methods: Vec<FuncDecl>) -> Stmt {
    stmt(StmtKind::Impl(ImplDecl {
        trait_name: name(trait_name),
        ty,
        methods,
    }))
}

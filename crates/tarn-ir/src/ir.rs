//! Typed IR node definitions.

use crate::Type;

/// Unique identity of a binding. Shadowed names get distinct ids, and the
/// compiler allocates storage per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

/// A sequence of statements. When `ty` is not `Void`, the last statement is
/// an expression statement producing the block's value.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub ty: Type,
}

impl Block {
    pub fn empty() -> Self {
        Self {
            stmts: Vec::new(),
            ty: Type::void(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { binding: BindingId, value: Expr },
    Return(Option<Expr>),
    While { cond: Expr, body: Block },
    For {
        binding: BindingId,
        iterable: Expr,
        body: Block,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Self { kind, ty }
    }

    /// Visit this expression and every expression nested in it, including
    /// those inside blocks and function bodies.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Primitive(_) | ExprKind::String(_) | ExprKind::Ident(_) => {}
            ExprKind::Object { fields, .. } => fields.iter().for_each(|e| e.walk(f)),
            ExprKind::Func(func) => {
                func.captures.iter().for_each(|c| c.value.walk(f));
                func.body.walk(f);
            }
            ExprKind::Call { callee, args, .. } => {
                callee.walk(f);
                args.iter().for_each(|e| e.walk(f));
            }
            ExprKind::Builtin { args, .. } => args.iter().for_each(|e| e.walk(f)),
            ExprKind::Field { target, .. } => target.walk(f),
            ExprKind::Do(block) => block.walk(f),
            ExprKind::If {
                branches,
                else_block,
            } => {
                for (cond, block) in branches {
                    cond.walk(f);
                    block.walk(f);
                }
                else_block.walk(f);
            }
            ExprKind::Match { target, cases, .. } => {
                target.walk(f);
                cases.iter().for_each(|b| b.walk(f));
            }
        }
    }
}

impl Block {
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        self.stmts.iter().for_each(|s| s.walk(f));
    }
}

impl Stmt {
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        match self {
            Stmt::Let { value, .. } => value.walk(f),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    value.walk(f);
                }
            }
            Stmt::While { cond, body } => {
                cond.walk(f);
                body.walk(f);
            }
            Stmt::For { iterable, body, .. } => {
                iterable.walk(f);
                body.walk(f);
            }
            Stmt::Expr(e) => e.walk(f),
        }
    }
}

impl Program {
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        self.stmts.iter().for_each(|s| s.walk(f));
    }

    /// All function expressions in the program, outermost first.
    pub fn functions(&self) -> Vec<&FuncExpr> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let ExprKind::Func(func) = &e.kind {
                out.push(func.as_ref());
            }
        });
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Int(i64),
    Float(f64),
    Bool(bool),
    Void,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Primitive(Primitive),
    String(String),
    Ident(BindingId),
    /// Struct, tuple, array, or enum payload. Fields are in declaration order.
    Object {
        tag: Option<usize>,
        fields: Vec<Expr>,
    },
    Func(Box<FuncExpr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// False when the callee returns `Void`.
        has_value: bool,
    },
    Builtin { op: Op, args: Vec<Expr> },
    Field { target: Box<Expr>, index: usize },
    Do(Block),
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Block,
    },
    /// The compiler stores `target` in `scrutinee` and dispatches on its tag;
    /// `cases` are ordered by tag index.
    Match {
        scrutinee: BindingId,
        target: Box<Expr>,
        cases: Vec<Block>,
    },
}

/// A captured variable: inside the function it is `binding`, and `value`
/// produces it in the enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub binding: BindingId,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncExpr {
    pub name: Option<String>,
    pub captures: Vec<Capture>,
    /// Trait-obligation parameters first, then the formal parameters.
    pub params: Vec<BindingId>,
    pub body: Block,
}

impl FuncExpr {
    pub fn captured(&self) -> Vec<BindingId> {
        self.captures.iter().map(|c| c.binding).collect()
    }
}

/// Intrinsic opcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Not,
    And,
    Or,
    PrintInt,
    PrintFloat,
    PrintString,
    PrintBool,
    Show,
    Debug,
    /// Built-in evidence that `ty` implements `bound`.
    Dictionary { bound: String, ty: String },
}

//! The tree walker.
//! 语法树遍历器。
//!
//! Walks the syntax tree, dispatching each node to the function engine,
//! the object layer, or the statement checks below, and produces the
//! typed IR. Each top-level statement and each statement directly in a
//! function body is checked with its own [`Unifier`]; nested blocks share
//! the unifier of the statement that contains them.

use tarn_common::Span;
use tarn_ir::{self as ir, TyCon, Type};
use tarn_syntax::{self as ast, ExprKind, LetPattern, StmtKind};
use tracing::{debug, instrument};

use crate::builtins;
use crate::errors::{At, Result, TypeErrorKind};
use crate::func::FnCtx;
use crate::infer::InferContext;
use crate::obj::AdtTable;
use crate::scope::Scope;
use crate::traits::TraitRegistry;
use crate::unify::Unifier;

/// Knobs for a checking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Seed the built-in types, traits, operators, and intrinsics.
    pub prelude: bool,
    /// Deepest expression nesting accepted before giving up.
    pub max_depth: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            prelude: true,
            max_depth: 512,
        }
    }
}

impl CheckOptions {
    pub fn without_prelude(mut self) -> Self {
        self.prelude = false;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// The type checker.
pub struct TypeChecker {
    pub(crate) options: CheckOptions,
    pub(crate) infer: InferContext,
    pub(crate) traits: TraitRegistry,
    pub(crate) adts: AdtTable,
    pub(crate) scope: Scope,
    /// Innermost function last.
    pub(crate) functions: Vec<FnCtx>,
    depth: usize,
    prelude_installed: bool,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::with_options(CheckOptions::default())
    }

    pub fn with_options(options: CheckOptions) -> Self {
        Self {
            options,
            infer: InferContext::new(),
            traits: TraitRegistry::new(),
            adts: AdtTable::default(),
            scope: Scope::new(),
            functions: Vec::new(),
            depth: 0,
            prelude_installed: false,
        }
    }

    /// Create a checker without the prelude.
    pub fn without_prelude() -> Self {
        Self::with_options(CheckOptions::default().without_prelude())
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Get the trait registry.
    pub fn trait_registry(&self) -> &TraitRegistry {
        &self.traits
    }

    pub fn adts(&self) -> &AdtTable {
        &self.adts
    }

    /// Check a whole program. Declarations persist in this checker, so a
    /// later call sees the types, traits, and values of earlier ones.
    #[instrument(level = "debug", skip_all, fields(stmts = program.stmts.len()))]
    pub fn check(&mut self, program: &ast::Program) -> Result<ir::Program> {
        if self.options.prelude && !self.prelude_installed {
            builtins::install(&mut self.scope, &mut self.traits, &self.infer).at(Span::DUMMY)?;
            self.prelude_installed = true;
        }

        // Type names are visible to every declaration, so types may refer
        // to each other regardless of order.
        for stmt in &program.stmts {
            match &stmt.kind {
                StmtKind::Struct(decl) => self.declare_adt(&decl.name, &decl.generics)?,
                StmtKind::Enum(decl) => self.declare_adt(&decl.name, &decl.generics)?,
                _ => {}
            }
        }

        let mut stmts = Vec::new();
        for stmt in &program.stmts {
            let mut u = self.unifier();
            let start = stmts.len();
            self.check_stmt(stmt, &mut u, &mut stmts)?;
            stmts[start..].iter_mut().for_each(|s| apply_stmt(s, &u));
        }

        debug!(stmts = stmts.len(), "program checked");
        Ok(ir::Program { stmts })
    }

    pub(crate) fn unifier(&self) -> Unifier {
        Unifier::new(self.infer.clone())
    }

    /// Run `f` inside a new scope frame.
    pub(crate) fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.scope.push();
        let result = f(self);
        self.scope.pop();
        result
    }

    pub(crate) fn check_stmt(
        &mut self,
        stmt: &ast::Stmt,
        u: &mut Unifier,
        out: &mut Vec<ir::Stmt>,
    ) -> Result<()> {
        match &stmt.kind {
            StmtKind::Let { pattern, ty, value } => {
                self.check_let(pattern, ty.as_ref(), value, u, out)?;
            }
            StmtKind::Func(decl) => out.push(self.check_func_stmt(decl)?),
            StmtKind::Struct(decl) => {
                self.require_top_level("struct", stmt.span)?;
                self.define_struct(decl)?;
            }
            StmtKind::Enum(decl) => {
                self.require_top_level("enum", stmt.span)?;
                self.define_enum(decl)?;
            }
            StmtKind::Trait(decl) => {
                self.require_top_level("trait", stmt.span)?;
                self.declare_trait(decl)?;
            }
            StmtKind::Impl(decl) => {
                self.require_top_level("impl", stmt.span)?;
                out.push(self.check_impl(decl, stmt.span)?);
            }
            StmtKind::Return(value) => {
                out.push(self.check_return(value.as_ref(), stmt.span, u)?);
            }
            StmtKind::While { cond, body } => {
                let cond = self.check_condition(cond, u)?;
                let body = self.check_block(body, None, u)?;
                out.push(ir::Stmt::While { cond, body });
            }
            StmtKind::For {
                name,
                iterable,
                body,
            } => {
                let iterable = self.check_expr(iterable, None, u)?;
                let elem = match u.resolve(&iterable.ty) {
                    Type::Con(c) if c.con == TyCon::Array => c.params[0].clone(),
                    other => return Err(TypeErrorKind::NotIterable(other).at(stmt.span)),
                };
                let (binding, body) = self.in_scope(|this| {
                    let binding = this.scope.init_local(&name.node, elem);
                    let body = this.check_block(body, None, u)?;
                    Ok((binding, body))
                })?;
                out.push(ir::Stmt::For {
                    binding,
                    iterable,
                    body,
                });
            }
            StmtKind::Expr(expr) => {
                let expr = self.check_expr(expr, None, u)?;
                out.push(ir::Stmt::Expr(expr));
            }
        }
        Ok(())
    }

    fn require_top_level(&self, what: &str, span: Span) -> Result<()> {
        if self.scope.is_root() {
            return Ok(());
        }
        Err(TypeErrorKind::InvalidContext(format!("`{what}` declarations are only allowed at the top level")).at(span))
    }

    fn check_let(
        &mut self,
        pattern: &LetPattern,
        annotation: Option<&ast::TypeExpr>,
        value: &ast::Expr,
        u: &mut Unifier,
        out: &mut Vec<ir::Stmt>,
    ) -> Result<()> {
        let declared = annotation.map(|t| self.resolve_type_expr(t)).transpose()?;
        let value_ir = self.check_expr(value, declared.as_ref(), u)?;
        let ty = match &declared {
            Some(declared) => u.unify(&self.traits, declared, &value_ir.ty).at(value.span)?,
            None => value_ir.ty.clone(),
        };
        let ty = u.resolve(&ty);

        match pattern {
            LetPattern::Name(name) => {
                let binding = self.scope.init_local(&name.node, ty);
                out.push(ir::Stmt::Let {
                    binding,
                    value: value_ir,
                });
            }
            LetPattern::Tuple(names) => {
                let elems = match &ty {
                    Type::Con(c) if matches!(c.con, TyCon::Tuple(_)) => c.params.clone(),
                    _ => {
                        let expected = Type::tuple(
                            names
                                .iter()
                                .map(|n| self.infer.fresh_var(&n.node, Default::default()))
                                .collect(),
                        );
                        return Err(TypeErrorKind::TypeMismatch { expected, found: ty }.at(value.span));
                    }
                };
                if elems.len() != names.len() {
                    return Err(TypeErrorKind::ArityMismatch {
                        what: "tuple elements",
                        expected: elems.len(),
                        found: names.len(),
                    }
                    .at(value.span));
                }

                let tmp = self.scope.fresh_binding();
                out.push(ir::Stmt::Let {
                    binding: tmp,
                    value: value_ir,
                });
                for (index, (name, elem)) in names.iter().zip(elems).enumerate() {
                    let target = ir::Expr::new(ir::ExprKind::Ident(tmp), ty.clone());
                    let binding = self.scope.init_local(&name.node, elem.clone());
                    out.push(ir::Stmt::Let {
                        binding,
                        value: ir::Expr::new(
                            ir::ExprKind::Field {
                                target: Box::new(target),
                                index,
                            },
                            elem,
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_return(&mut self, value: Option<&ast::Expr>, span: Span, u: &mut Unifier) -> Result<ir::Stmt> {
        let Some(ctx) = self.functions.last() else {
            return Err(TypeErrorKind::InvalidContext("`return` outside of a function".into()).at(span));
        };
        let expected = ctx.ret.clone();
        let value = value.map(|v| self.check_expr(v, expected.as_ref(), u)).transpose()?;
        let ty = value.as_ref().map_or_else(Type::void, |v| v.ty.clone());
        self.record_return(&ty, span, u)?;
        Ok(ir::Stmt::Return(value))
    }

    fn check_condition(&mut self, cond: &ast::Expr, u: &mut Unifier) -> Result<ir::Expr> {
        let cond_ir = self.check_expr(cond, Some(&Type::bool()), u)?;
        u.unify(&self.traits, &Type::bool(), &cond_ir.ty).at(cond.span)?;
        Ok(cond_ir)
    }

    /// Check a block in a new scope frame.
    pub(crate) fn check_block(
        &mut self,
        block: &ast::Block,
        expected: Option<&Type>,
        u: &mut Unifier,
    ) -> Result<ir::Block> {
        self.in_scope(|this| this.check_stmts(&block.stmts, expected, u))
    }

    /// Check statements in the current frame. A trailing expression
    /// statement gives the block its value.
    pub(crate) fn check_stmts(
        &mut self,
        stmts: &[ast::Stmt],
        expected: Option<&Type>,
        u: &mut Unifier,
    ) -> Result<ir::Block> {
        let mut out = Vec::new();
        let mut ty = Type::void();
        for (i, stmt) in stmts.iter().enumerate() {
            if i + 1 == stmts.len()
                && let StmtKind::Expr(expr) = &stmt.kind
            {
                let value = self.check_expr(expr, expected, u)?;
                ty = value.ty.clone();
                out.push(ir::Stmt::Expr(value));
            } else {
                self.check_stmt(stmt, u, &mut out)?;
            }
        }
        Ok(ir::Block { stmts: out, ty })
    }

    /// Check an expression. `expected` is a hint from the context: closures
    /// need it, everything else may ignore it. Callers unify.
    pub(crate) fn check_expr(
        &mut self,
        expr: &ast::Expr,
        expected: Option<&Type>,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        self.depth += 1;
        let result = if self.depth > self.options.max_depth {
            Err(TypeErrorKind::InvalidContext(format!(
                "expression nesting exceeds the limit of {}",
                self.options.max_depth
            ))
            .at(expr.span))
        } else {
            self.check_expr_kind(expr, expected, u)
        };
        self.depth -= 1;
        result
    }

    fn check_expr_kind(
        &mut self,
        expr: &ast::Expr,
        expected: Option<&Type>,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        use ir::Primitive;

        let span = expr.span;
        match &expr.kind {
            ExprKind::Int(n) => Ok(ir::Expr::new(ir::ExprKind::Primitive(Primitive::Int(*n)), Type::int())),
            ExprKind::Float(n) => Ok(ir::Expr::new(
                ir::ExprKind::Primitive(Primitive::Float(*n)),
                Type::float(),
            )),
            ExprKind::Bool(b) => Ok(ir::Expr::new(ir::ExprKind::Primitive(Primitive::Bool(*b)), Type::bool())),
            ExprKind::Str(s) => Ok(ir::Expr::new(ir::ExprKind::String(s.clone()), Type::string())),

            ExprKind::Ident(name) => self.check_ident(name, span),

            ExprKind::Tuple(elems) => {
                let hints: Vec<Type> = expected
                    .map(|t| u.resolve(t))
                    .and_then(|t| match t {
                        Type::Con(c) if c.con == TyCon::Tuple(elems.len()) => Some(c.params),
                        _ => None,
                    })
                    .unwrap_or_default();
                let mut fields = Vec::with_capacity(elems.len());
                for (i, elem) in elems.iter().enumerate() {
                    fields.push(self.check_expr(elem, hints.get(i), u)?);
                }
                let ty = Type::tuple(fields.iter().map(|f| f.ty.clone()).collect());
                Ok(ir::Expr::new(ir::ExprKind::Object { tag: None, fields }, ty))
            }

            ExprKind::Array(elems) => {
                let hint = expected.map(|t| u.resolve(t)).and_then(|t| match t {
                    Type::Con(c) if c.con == TyCon::Array => c.params.into_iter().next(),
                    _ => None,
                });
                let mut elem_ty = self.infer.fresh_var("T", Default::default());
                let mut fields = Vec::with_capacity(elems.len());
                for elem in elems {
                    let known = u.resolve(&elem_ty);
                    let elem_hint = if known.as_var().is_some() { hint.clone() } else { Some(known) };
                    let value = self.check_expr(elem, elem_hint.as_ref(), u)?;
                    elem_ty = u.unify(&self.traits, &elem_ty, &value.ty).at(elem.span)?;
                    fields.push(value);
                }
                let ty = Type::array(u.resolve(&elem_ty), fields.len());
                Ok(ir::Expr::new(ir::ExprKind::Object { tag: None, fields }, ty))
            }

            ExprKind::Construct { ty, tag, fields } => {
                self.check_construct(ty, tag.as_ref(), fields, span, u)
            }
            ExprKind::Field { target, field } => self.check_field(target, field, span, u),

            ExprKind::Call { callee, args } => {
                let args: Vec<&ast::Expr> = args.iter().collect();
                self.check_call(callee, &args, span, u)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_operator(op.symbol(), &[lhs.as_ref(), rhs.as_ref()], span, u)
            }
            ExprKind::Unary { op, operand } => self.check_operator(op.symbol(), &[operand.as_ref()], span, u),

            ExprKind::Closure { params, body } => self.check_closure(params, body, expected, span, u),

            ExprKind::If {
                branches,
                else_block,
            } => self.check_if(branches, else_block.as_ref(), expected, span, u),

            ExprKind::Match { target, cases } => self.check_match(target, cases, expected, span, u),

            ExprKind::Do(block) => {
                let block = self.check_block(block, expected, u)?;
                let ty = block.ty.clone();
                Ok(ir::Expr::new(ir::ExprKind::Do(block), ty))
            }
        }
    }

    fn check_if(
        &mut self,
        branches: &[(ast::Expr, ast::Block)],
        else_block: Option<&ast::Block>,
        expected: Option<&Type>,
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let mut branches_ir = Vec::with_capacity(branches.len());
        let mut result: Option<Type> = None;
        for (cond, block) in branches {
            let cond = self.check_condition(cond, u)?;
            let block_ir = self.check_block(block, expected, u)?;
            result = Some(match result {
                Some(prev) => u.unify(&self.traits, &prev, &block_ir.ty).at(block.span)?,
                None => block_ir.ty.clone(),
            });
            branches_ir.push((cond, block_ir));
        }

        let (else_ir, else_span) = match else_block {
            Some(block) => (self.check_block(block, expected, u)?, block.span),
            None => (ir::Block::empty(), span),
        };
        let ty = match result {
            Some(prev) => u.unify(&self.traits, &prev, &else_ir.ty).at(else_span)?,
            None => else_ir.ty.clone(),
        };

        Ok(ir::Expr::new(
            ir::ExprKind::If {
                branches: branches_ir,
                else_block: else_ir,
            },
            u.resolve(&ty),
        ))
    }
}

/// Write the resolved form of every type in a checked statement back into
/// the IR.
pub(crate) fn apply_stmt(stmt: &mut ir::Stmt, u: &Unifier) {
    match stmt {
        ir::Stmt::Let { value, .. } => apply_expr(value, u),
        ir::Stmt::Return(value) => {
            if let Some(value) = value {
                apply_expr(value, u);
            }
        }
        ir::Stmt::While { cond, body } => {
            apply_expr(cond, u);
            apply_block(body, u);
        }
        ir::Stmt::For { iterable, body, .. } => {
            apply_expr(iterable, u);
            apply_block(body, u);
        }
        ir::Stmt::Expr(expr) => apply_expr(expr, u),
    }
}

pub(crate) fn apply_block(block: &mut ir::Block, u: &Unifier) {
    block.ty = u.resolve(&block.ty);
    block.stmts.iter_mut().for_each(|s| apply_stmt(s, u));
}

fn apply_expr(expr: &mut ir::Expr, u: &Unifier) {
    expr.ty = u.resolve(&expr.ty);
    match &mut expr.kind {
        ir::ExprKind::Primitive(_) | ir::ExprKind::String(_) | ir::ExprKind::Ident(_) => {}
        ir::ExprKind::Object { fields, .. } => fields.iter_mut().for_each(|e| apply_expr(e, u)),
        ir::ExprKind::Func(func) => {
            func.captures.iter_mut().for_each(|c| apply_expr(&mut c.value, u));
            apply_block(&mut func.body, u);
        }
        ir::ExprKind::Call { callee, args, .. } => {
            apply_expr(callee, u);
            args.iter_mut().for_each(|e| apply_expr(e, u));
        }
        ir::ExprKind::Builtin { args, .. } => args.iter_mut().for_each(|e| apply_expr(e, u)),
        ir::ExprKind::Field { target, .. } => apply_expr(target, u),
        ir::ExprKind::Do(block) => apply_block(block, u),
        ir::ExprKind::If {
            branches,
            else_block,
        } => {
            for (cond, block) in branches {
                apply_expr(cond, u);
                apply_block(block, u);
            }
            apply_block(else_block, u);
        }
        ir::ExprKind::Match { target, cases, .. } => {
            apply_expr(target, u);
            cases.iter_mut().for_each(|b| apply_block(b, u));
        }
    }
}

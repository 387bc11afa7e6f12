//! Functions: declarations, closures, calls, and dictionary passing.
//! 函数：声明、闭包、调用与字典传递。
//!
//! A generic function is checked once. While its body is walked, each type
//! parameter is a tracer type that only unifies with itself, and each trait
//! bound on it becomes a leading dictionary parameter. Callers instantiate
//! the signature with fresh variables and pass the evidence found for the
//! resolved type arguments.

use std::collections::{HashMap, HashSet};

use tarn_common::Span;
use tarn_ir::{self as ir, BindingId, Concrete, Obligation, Op, Trait, TyCon, TyVar, Type};
use tarn_syntax::{self as ast, StmtKind};
use tracing::debug;

use crate::check::{TypeChecker, apply_stmt};
use crate::errors::{At, Result, TypeErrorKind};
use crate::scope::{Upvalue, ValueBinding, ValueKind};
use crate::traits::Evidence;
use crate::unify::{Unifier, freshen, substitute};

/// Return-type bookkeeping for the function whose body is being walked.
#[derive(Debug, Clone, Default)]
pub(crate) struct FnCtx {
    /// Declared, or inferred from the returns seen so far.
    pub ret: Option<Type>,
    pub returned: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct GenericParam {
    pub name: String,
    pub var: TyVar,
    pub bounds: Vec<Trait>,
}

/// The externally visible signature of a declared function.
#[derive(Debug, Clone)]
pub(crate) struct Signature {
    pub generics: Vec<GenericParam>,
    pub params: Vec<Type>,
    pub ret: Type,
    pub ret_declared: bool,
}

impl Signature {
    pub fn obligations(&self) -> Vec<Obligation> {
        self.generics
            .iter()
            .flat_map(|g| {
                g.bounds.iter().map(|bound| Obligation {
                    ty: Type::Var(g.var.clone()),
                    bound: bound.clone(),
                })
            })
            .collect()
    }

    pub fn ty(&self) -> Type {
        Type::func_with(self.obligations(), self.params.clone(), self.ret.clone())
    }

    pub fn generic_vars(&self) -> Vec<TyVar> {
        self.generics.iter().map(|g| g.var.clone()).collect()
    }
}

/// What a call dispatches to.
enum Callee {
    Expr(ir::Expr),
    Builtin(Op),
    Method { index: usize },
}

/// The type of a dictionary proving `ty: bound`.
pub(crate) fn dictionary_type(bound: &Trait, ty: &Type) -> Type {
    Type::named(bound.name(), vec![ty.clone()])
}

/// Map tracer types back to the signature variables they stand for.
fn untrace(ty: &Type, tracers: &HashMap<u32, Type>) -> Type {
    match ty {
        Type::Var(_) => ty.clone(),
        Type::Con(c) => {
            if let TyCon::Tracer(id, _) = &c.con
                && let Some(var) = tracers.get(id)
            {
                return var.clone();
            }
            Type::Con(Concrete {
                con: c.con.clone(),
                params: c.params.iter().map(|p| untrace(p, tracers)).collect(),
                obligations: c
                    .obligations
                    .iter()
                    .map(|o| Obligation {
                        ty: untrace(&o.ty, tracers),
                        bound: o.bound.clone(),
                    })
                    .collect(),
                array_size: c.array_size,
            })
        }
    }
}

fn captures(upvalues: Vec<Upvalue>) -> Vec<ir::Capture> {
    upvalues
        .into_iter()
        .map(|up| ir::Capture {
            binding: up.binding,
            value: ir::Expr::new(ir::ExprKind::Ident(up.binding), up.ty),
        })
        .collect()
}

impl TypeChecker {
    /// Resolve generics, parameters, and the return annotation of a
    /// declaration. An unannotated return type is a fresh variable.
    pub(crate) fn declare_signature(&mut self, decl: &ast::FuncDecl) -> Result<Signature> {
        let generics = self.declare_generics(&decl.generics)?;
        self.in_scope(|this| {
            for g in &generics {
                this.scope.init_type(&g.name, Type::Var(g.var.clone()));
            }
            let params = decl
                .params
                .iter()
                .map(|p| this.resolve_type_expr(&p.ty))
                .collect::<Result<Vec<_>>>()?;
            let (ret, ret_declared) = match &decl.ret {
                Some(ret) => (this.resolve_type_expr(ret)?, true),
                None => (this.infer.fresh_var("R", Default::default()), false),
            };
            Ok(Signature {
                generics,
                params,
                ret,
                ret_declared,
            })
        })
    }

    pub(crate) fn declare_generics(&self, generics: &[ast::GenericParam]) -> Result<Vec<GenericParam>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(generics.len());
        for g in generics {
            if !seen.insert(g.name.node.as_str()) {
                return Err(TypeErrorKind::DuplicateDeclaration(g.name.node.clone()).at(g.name.span));
            }
            let mut bounds = Vec::with_capacity(g.bounds.len());
            for bound in &g.bounds {
                if !self.traits.is_declared(&bound.node) {
                    return Err(TypeErrorKind::UnknownType(bound.node.clone()).at(bound.span));
                }
                bounds.push(Trait::new(&bound.node));
            }
            out.push(GenericParam {
                name: g.name.node.clone(),
                var: self.infer.fresh_tyvar(&g.name.node, bounds.iter().cloned().collect()),
                bounds,
            });
        }
        Ok(out)
    }

    /// Check a `func` statement and bind its name in the current frame.
    pub(crate) fn check_func_stmt(&mut self, decl: &ast::FuncDecl) -> Result<ir::Stmt> {
        let sig = self.declare_signature(decl)?;
        let binding = self.scope.fresh_binding();
        self.scope.init_value(
            &decl.name.node,
            ValueBinding {
                kind: ValueKind::Local(binding),
                ty: sig.ty(),
                generics: sig.generic_vars(),
            },
        );
        debug!(name = %decl.name.node, ty = %sig.ty(), "declare function");

        let (func, ty) = self.check_func(decl, &sig)?;
        self.scope.set_value_type(&decl.name.node, ty.clone());
        Ok(ir::Stmt::Let {
            binding,
            value: ir::Expr::new(ir::ExprKind::Func(Box::new(func)), ty),
        })
    }

    /// Check a declared function's body against its signature. Returns the
    /// function and its final external type.
    pub(crate) fn check_func(&mut self, decl: &ast::FuncDecl, sig: &Signature) -> Result<(ir::FuncExpr, Type)> {
        self.scope.push_function();
        let result = self.check_func_in_frame(decl, sig);
        let upvalues = self.scope.pop_function();
        let (params, body, ret) = result?;

        if !upvalues.is_empty() {
            debug!(name = %decl.name.node, captures = upvalues.len(), "captured upvalues");
        }
        let ty = Type::func_with(sig.obligations(), sig.params.clone(), ret);
        let func = ir::FuncExpr {
            name: Some(decl.name.node.clone()),
            captures: captures(upvalues),
            params,
            body,
        };
        Ok((func, ty))
    }

    fn check_func_in_frame(
        &mut self,
        decl: &ast::FuncDecl,
        sig: &Signature,
    ) -> Result<(Vec<BindingId>, ir::Block, Type)> {
        let mut params = Vec::new();
        let mut tracers = HashMap::new();

        for g in &sig.generics {
            let id = self.infer.fresh_id();
            let tracer = Type::tracer(id, &g.name);
            tracers.insert(id, Type::Var(g.var.clone()));
            self.scope.init_type(&g.name, tracer.clone());

            for bound in &g.bounds {
                let name = format!("${bound}<{}#{id}>", g.name);
                let binding = self
                    .scope
                    .init_param(&name, dictionary_type(bound, &tracer))
                    .at(decl.span)?;
                self.traits
                    .provide(&tracer, bound.clone(), Evidence::Binding { name, binding })
                    .at(decl.span)?;
                params.push(binding);
            }
        }

        for param in &decl.params {
            let ty = self.resolve_type_expr(&param.ty)?;
            params.push(self.scope.init_param(&param.name.node, ty).at(param.name.span)?);
        }

        let declared = decl.ret.as_ref().map(|t| self.resolve_type_expr(t)).transpose()?;
        let (body, ret) = self.check_body(&decl.body, declared)?;

        let ret = if sig.ret_declared { sig.ret.clone() } else { untrace(&ret, &tracers) };
        Ok((params, body, ret))
    }

    /// Walk a function body. Every statement gets its own unifier; the
    /// return type is carried between them in the function context.
    pub(crate) fn check_body(&mut self, block: &ast::Block, declared: Option<Type>) -> Result<(ir::Block, Type)> {
        self.functions.push(FnCtx {
            ret: declared,
            returned: false,
        });
        let result = self.check_body_stmts(block);
        let ctx = self.functions.pop().unwrap_or_default();
        let body = result?;
        Ok((body, ctx.ret.unwrap_or_else(Type::void)))
    }

    fn check_body_stmts(&mut self, block: &ast::Block) -> Result<ir::Block> {
        let mut out = Vec::new();
        let mut trailing = false;

        for (i, stmt) in block.stmts.iter().enumerate() {
            let mut u = self.unifier();
            let start = out.len();
            if i + 1 == block.stmts.len()
                && let StmtKind::Expr(expr) = &stmt.kind
            {
                let expected = self.functions.last().and_then(|f| f.ret.clone());
                let value = self.check_expr(expr, expected.as_ref(), &mut u)?;
                self.record_return(&value.ty, expr.span, &mut u)?;
                if u.resolve(&value.ty).is_void() {
                    out.push(ir::Stmt::Expr(value));
                    out.push(ir::Stmt::Return(None));
                } else {
                    out.push(ir::Stmt::Return(Some(value)));
                }
                trailing = true;
            } else {
                self.check_stmt(stmt, &mut u, &mut out)?;
            }
            out[start..].iter_mut().for_each(|s| apply_stmt(s, &u));
        }

        if !trailing {
            if !self.functions.last().is_some_and(|f| f.returned) {
                let mut u = self.unifier();
                self.record_return(&Type::void(), block.span, &mut u)?;
            }
            if !matches!(out.last(), Some(ir::Stmt::Return(_))) {
                out.push(ir::Stmt::Return(None));
            }
        }

        let ty = self
            .functions
            .last()
            .and_then(|f| f.ret.clone())
            .unwrap_or_else(Type::void);
        Ok(ir::Block { stmts: out, ty })
    }

    /// Merge a returned type into the current function's return type.
    pub(crate) fn record_return(&mut self, ty: &Type, span: Span, u: &mut Unifier) -> Result<()> {
        let Some(prev) = self.functions.last().map(|f| f.ret.clone()) else {
            return Err(TypeErrorKind::InvalidContext("`return` outside of a function".into()).at(span));
        };
        let ty = match prev {
            Some(prev) => u.unify(&self.traits, &prev, ty).at(span)?,
            None => ty.clone(),
        };
        let ty = u.resolve(&ty);
        if let Some(ctx) = self.functions.last_mut() {
            ctx.ret = Some(ty);
            ctx.returned = true;
        }
        Ok(())
    }

    /// Check a closure against the function type its context expects.
    pub(crate) fn check_closure(
        &mut self,
        params: &[ast::ClosureParam],
        body: &ast::Block,
        expected: Option<&Type>,
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let expected = expected.map(|t| u.resolve(t));
        let Some((_, exp_params, exp_ret)) = expected.as_ref().and_then(Type::as_func) else {
            return Err(TypeErrorKind::MissingTypeContext.at(span));
        };
        if exp_params.len() != params.len() {
            return Err(TypeErrorKind::ArityMismatch {
                what: "closure parameters",
                expected: exp_params.len(),
                found: params.len(),
            }
            .at(span));
        }
        let exp_params = exp_params.to_vec();
        let exp_ret = exp_ret.clone();

        let mut param_tys = Vec::with_capacity(params.len());
        for (param, exp) in params.iter().zip(&exp_params) {
            let ty = match &param.ty {
                Some(annotation) => {
                    let declared = self.resolve_type_expr(annotation)?;
                    u.unify(&self.traits, exp, &declared).at(param.name.span)?
                }
                None => exp.clone(),
            };
            let ty = u.resolve(&ty);
            if ty.as_var().is_some() {
                return Err(TypeErrorKind::MissingTypeContext.at(param.name.span));
            }
            param_tys.push(ty);
        }

        let declared_ret = Some(u.resolve(&exp_ret)).filter(|r| r.as_var().is_none());

        self.scope.push_function();
        let result = self.check_closure_in_frame(params, &param_tys, body, declared_ret);
        let upvalues = self.scope.pop_function();
        let (ids, body_ir, ret) = result?;

        let ret = u.unify(&self.traits, &exp_ret, &ret).at(body.span)?;
        let ty = Type::func(param_tys, u.resolve(&ret));
        let func = ir::FuncExpr {
            name: None,
            captures: captures(upvalues),
            params: ids,
            body: body_ir,
        };
        Ok(ir::Expr::new(ir::ExprKind::Func(Box::new(func)), ty))
    }

    fn check_closure_in_frame(
        &mut self,
        params: &[ast::ClosureParam],
        types: &[Type],
        body: &ast::Block,
        declared: Option<Type>,
    ) -> Result<(Vec<BindingId>, ir::Block, Type)> {
        let mut ids = Vec::with_capacity(params.len());
        for (param, ty) in params.iter().zip(types) {
            ids.push(self.scope.init_param(&param.name.node, ty.clone()).at(param.name.span)?);
        }
        let (body, ret) = self.check_body(body, declared)?;
        Ok((ids, body, ret))
    }

    pub(crate) fn lookup_value(&mut self, name: &str, span: Span) -> Result<ValueBinding> {
        self.scope
            .get_value(name)
            .ok_or_else(|| TypeErrorKind::UnknownIdentifier(name.to_string()).at(span))
    }

    /// The type of a reference to `binding`, with its generics freshened.
    pub(crate) fn instantiate(&self, binding: &ValueBinding) -> Type {
        if binding.generics.is_empty() {
            return binding.ty.clone();
        }
        substitute(&binding.ty, &freshen(&self.infer, &binding.generics))
    }

    /// A value reference that is not in call position.
    pub(crate) fn check_ident(&mut self, name: &str, span: Span) -> Result<ir::Expr> {
        let binding = self.lookup_value(name, span)?;
        match binding.kind {
            ValueKind::Local(id) => {
                let ty = self.instantiate(&binding);
                Ok(ir::Expr::new(ir::ExprKind::Ident(id), ty))
            }
            ValueKind::Builtin(_) | ValueKind::Method { .. } => {
                Err(TypeErrorKind::InvalidContext(format!("`{name}` can only be called")).at(span))
            }
        }
    }

    fn callee_for(&self, binding: &ValueBinding) -> (Callee, Type) {
        let ty = self.instantiate(binding);
        let callee = match &binding.kind {
            ValueKind::Local(id) => Callee::Expr(ir::Expr::new(ir::ExprKind::Ident(*id), ty.clone())),
            ValueKind::Builtin(op) => Callee::Builtin(op.clone()),
            ValueKind::Method { index, .. } => Callee::Method { index: *index },
        };
        (callee, ty)
    }

    pub(crate) fn check_call(
        &mut self,
        callee: &ast::Expr,
        args: &[&ast::Expr],
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let (callee_ir, ty) = match &callee.kind {
            ast::ExprKind::Ident(name) => {
                let binding = self.lookup_value(name, callee.span)?;
                self.callee_for(&binding)
            }
            _ => {
                let callee_ir = self.check_expr(callee, None, u)?;
                let ty = callee_ir.ty.clone();
                (Callee::Expr(callee_ir), ty)
            }
        };
        self.finish_call(callee_ir, &ty, args, callee.span, span, u)
    }

    /// Operators are calls to the built-in function named by their symbol.
    pub(crate) fn check_operator(
        &mut self,
        symbol: &str,
        args: &[&ast::Expr],
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let binding = self.lookup_value(symbol, span)?;
        let (callee, ty) = self.callee_for(&binding);
        self.finish_call(callee, &ty, args, span, span, u)
    }

    fn finish_call(
        &mut self,
        callee: Callee,
        ty: &Type,
        args: &[&ast::Expr],
        callee_span: Span,
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let ty = u.resolve(ty);
        let Some((obligations, params, ret)) = ty.as_func() else {
            return Err(TypeErrorKind::NotAFunction(ty.clone()).at(callee_span));
        };
        if params.len() != args.len() {
            return Err(TypeErrorKind::ArityMismatch {
                what: "arguments",
                expected: params.len(),
                found: args.len(),
            }
            .at(span));
        }

        let mut args_ir = Vec::with_capacity(args.len());
        for (param, arg) in params.iter().zip(args) {
            let hint = u.resolve(param);
            let value = self.check_expr(arg, Some(&hint), u)?;
            u.unify(&self.traits, param, &value.ty).at(arg.span)?;
            args_ir.push(value);
        }

        let mut evidence = Vec::with_capacity(obligations.len());
        for obligation in obligations {
            let arg_ty = u.resolve(&obligation.ty);
            let found = self.traits.require(&arg_ty, &obligation.bound).at(span)?;
            debug!(bound = %obligation.bound, ty = %arg_ty, "resolved obligation");
            evidence.push(self.evidence_expr(&found, &obligation.bound, &arg_ty, span)?);
        }

        let ret = u.resolve(ret);
        if ret.as_var().is_some() {
            return Err(TypeErrorKind::UnboundReturn(ret).at(span));
        }
        let has_value = !ret.is_void();

        let kind = match callee {
            Callee::Builtin(op) => ir::ExprKind::Builtin {
                op,
                args: evidence.into_iter().chain(args_ir).collect(),
            },
            Callee::Method { index } => {
                let Some(dict) = evidence.into_iter().next() else {
                    return Err(TypeErrorKind::InvalidContext("trait method without a dictionary".into()).at(span));
                };
                let method_ty = Type::func(params.iter().map(|p| u.resolve(p)).collect(), ret.clone());
                ir::ExprKind::Call {
                    callee: Box::new(ir::Expr::new(
                        ir::ExprKind::Field {
                            target: Box::new(dict),
                            index,
                        },
                        method_ty,
                    )),
                    args: args_ir,
                    has_value,
                }
            }
            Callee::Expr(callee) => ir::ExprKind::Call {
                callee: Box::new(callee),
                args: evidence.into_iter().chain(args_ir).collect(),
                has_value,
            },
        };
        Ok(ir::Expr::new(kind, ret))
    }

    /// The expression that passes `evidence` at a call site.
    fn evidence_expr(&mut self, evidence: &Evidence, bound: &Trait, ty: &Type, span: Span) -> Result<ir::Expr> {
        let dict_ty = dictionary_type(bound, ty);
        match evidence {
            Evidence::Intrinsic { bound, ty } => Ok(ir::Expr::new(
                ir::ExprKind::Builtin {
                    op: Op::Dictionary {
                        bound: bound.name().to_string(),
                        ty: ty.clone(),
                    },
                    args: Vec::new(),
                },
                dict_ty,
            )),
            Evidence::Binding { name, binding } => {
                // Resolving by name records the capture when the dictionary
                // lives outside the current function.
                if self.scope.get_value(name).is_none() {
                    return Err(TypeErrorKind::InvalidContext(format!("evidence for `{bound}` is out of scope")).at(span));
                }
                Ok(ir::Expr::new(ir::ExprKind::Ident(*binding), dict_ty))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrace_restores_signature_variables() {
        let var = Type::variable(tarn_ir::VarId(3), "T", Default::default());
        let tracers = HashMap::from([(9, var.clone())]);
        let traced = Type::tuple(vec![Type::tracer(9, "T"), Type::tracer(10, "U")]);
        assert_eq!(
            untrace(&traced, &tracers),
            Type::tuple(vec![var, Type::tracer(10, "U")])
        );
    }

    #[test]
    fn test_signature_obligations_follow_bounds() {
        let var = TyVar {
            id: tarn_ir::VarId(0),
            name: "T".into(),
            traits: Default::default(),
        };
        let sig = Signature {
            generics: vec![GenericParam {
                name: "T".into(),
                var,
                bounds: vec![Trait::new("Num"), Trait::new("Show")],
            }],
            params: vec![],
            ret: Type::void(),
            ret_declared: true,
        };
        let ty = sig.ty();
        let (obligations, _, _) = ty.as_func().unwrap();
        assert_eq!(obligations.len(), 2);
        assert_eq!(obligations[1].bound, Trait::new("Show"));
    }
}

//! User traits and impls.
//! 用户特征与实现。
//!
//! An impl becomes a dictionary: an object holding its methods in trait
//! declaration order, bound to a fresh binding that is registered as the
//! evidence for the implementing type.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tarn_common::Span;
use tarn_ir::{self as ir, Obligation, Trait, Type};
use tarn_syntax as ast;
use tracing::debug;

use crate::check::TypeChecker;
use crate::errors::{At, Result, TypeErrorKind};
use crate::func::dictionary_type;
use crate::scope::{ValueBinding, ValueKind};
use crate::traits::{Evidence, TraitInfo};
use crate::unify::substitute;

impl TypeChecker {
    pub(crate) fn declare_trait(&mut self, decl: &ast::TraitDecl) -> Result<()> {
        let name = &decl.name;
        if self.scope.declares_type(&name.node) {
            return Err(TypeErrorKind::DuplicateDeclaration(name.node.clone()).at(name.span));
        }
        let bound = Trait::new(&name.node);
        let self_var = self.infer.fresh_tyvar("Self", BTreeSet::from([bound.clone()]));

        let methods = self.in_scope(|this| {
            this.scope.init_type("Self", Type::Var(self_var.clone()));
            let mut methods = IndexMap::new();
            for method in &decl.methods {
                if methods.contains_key(&method.name.node) {
                    return Err(TypeErrorKind::DuplicateDeclaration(method.name.node.clone()).at(method.name.span));
                }
                let params = method
                    .params
                    .iter()
                    .map(|p| this.resolve_type_expr(p))
                    .collect::<Result<Vec<_>>>()?;
                let ret = this.resolve_type_expr(&method.ret)?;
                let obligation = Obligation {
                    ty: Type::Var(self_var.clone()),
                    bound: bound.clone(),
                };
                methods.insert(method.name.node.clone(), Type::func_with(vec![obligation], params, ret));
            }
            Ok(methods)
        })?;

        self.traits
            .declare(TraitInfo {
                name: bound.clone(),
                self_var: self_var.clone(),
                methods: methods.clone(),
            })
            .at(name.span)?;

        for (index, (method, ty)) in methods.into_iter().enumerate() {
            self.scope.init_value(
                &method,
                ValueBinding {
                    kind: ValueKind::Method {
                        bound: bound.clone(),
                        index,
                    },
                    ty,
                    generics: vec![self_var.clone()],
                },
            );
        }
        debug!(name = %bound, "declare trait");
        Ok(())
    }

    pub(crate) fn check_impl(&mut self, decl: &ast::ImplDecl, span: Span) -> Result<ir::Stmt> {
        let trait_name = &decl.trait_name;
        let info = self
            .traits
            .get(&trait_name.node)
            .cloned()
            .ok_or_else(|| TypeErrorKind::UnknownType(trait_name.node.clone()).at(trait_name.span))?;
        let target = self.resolve_type_expr(&decl.ty)?;
        let Type::Con(con) = &target else {
            return Err(TypeErrorKind::UnboundType(target.clone()).at(decl.ty.span));
        };
        // Evidence is keyed by constructor, so it must not depend on type
        // arguments.
        if !con.params.is_empty() {
            return Err(TypeErrorKind::InvalidContext(format!(
                "`impl {}` is only allowed for types without type arguments, found `{target}`",
                info.name
            ))
            .at(decl.ty.span));
        }

        let name = format!("${}<{}>", info.name, con.con);
        let binding = self.scope.fresh_binding();
        let dict_ty = dictionary_type(&info.name, &target);
        self.traits
            .provide(
                &target,
                info.name.clone(),
                Evidence::Binding {
                    name: name.clone(),
                    binding,
                },
            )
            .at(span)?;
        self.scope.init_value(&name, ValueBinding::local(binding, dict_ty.clone()));
        debug!(bound = %info.name, ty = %target, "declare impl");

        let self_map = HashMap::from([(info.self_var.id, target.clone())]);
        let mut slots: Vec<Option<ir::Expr>> = vec![None; info.methods.len()];
        for method in &decl.methods {
            let Some((index, sig)) = info.method(&method.name.node) else {
                return Err(TypeErrorKind::UnknownMethod {
                    bound: info.name.clone(),
                    method: method.name.node.clone(),
                }
                .at(method.name.span));
            };
            if slots[index].is_some() {
                return Err(TypeErrorKind::DuplicateDeclaration(method.name.node.clone()).at(method.name.span));
            }

            // The implementation itself takes no dictionary.
            let expected = match substitute(sig, &self_map).as_func() {
                Some((_, params, ret)) => Type::func(params.to_vec(), ret.clone()),
                None => return Err(TypeErrorKind::NotAFunction(sig.clone()).at(method.span)),
            };

            let method_sig = self.declare_signature(method)?;
            let (func, ty) = self.check_func(method, &method_sig)?;
            let mut u = self.unifier();
            u.unify(&self.traits, &expected, &ty).at(method.span)?;
            slots[index] = Some(ir::Expr::new(ir::ExprKind::Func(Box::new(func)), u.resolve(&ty)));
        }

        let mut fields = Vec::with_capacity(slots.len());
        for (slot, method) in slots.into_iter().zip(info.methods.keys()) {
            match slot {
                Some(func) => fields.push(func),
                None => {
                    return Err(TypeErrorKind::MissingMethod {
                        bound: info.name.clone(),
                        method: method.clone(),
                    }
                    .at(span));
                }
            }
        }

        Ok(ir::Stmt::Let {
            binding,
            value: ir::Expr::new(ir::ExprKind::Object { tag: None, fields }, dict_ty),
        })
    }
}

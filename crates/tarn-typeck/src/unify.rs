//! Type unification.
//! 类型统一。
//!
//! A [`Unifier`] owns the substitution of one checking unit. Variables
//! carry trait bounds; binding a variable to a concrete type requires
//! evidence from the [`TraitRegistry`] for each of them.

use std::collections::{BTreeSet, HashMap};

use tarn_ir::{Concrete, Obligation, TyVar, Type, VarId};
use tracing::trace;

use crate::errors::TypeErrorKind;
use crate::infer::InferContext;
use crate::traits::TraitRegistry;

/// A substitution mapping type variables to types.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: HashMap<VarId, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: VarId) -> Option<&Type> {
        self.map.get(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn insert(&mut self, id: VarId, ty: Type) {
        if let Type::Var(v) = &ty
            && v.id == id
        {
            return;
        }
        self.map.insert(id, ty);
    }

    /// Follow variable bindings until reaching a concrete type or an
    /// unbound variable. Does not descend into parameters.
    pub fn deref(&self, ty: &Type) -> Type {
        let mut current = ty;
        while let Type::Var(v) = current {
            match self.map.get(&v.id) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// Apply this substitution to a type, recursively.
    pub fn apply(&self, ty: &Type) -> Type {
        match self.deref(ty) {
            Type::Var(v) => Type::Var(v),
            Type::Con(c) => Type::Con(Concrete {
                con: c.con,
                params: c.params.iter().map(|p| self.apply(p)).collect(),
                obligations: c
                    .obligations
                    .iter()
                    .map(|o| Obligation {
                        ty: self.apply(&o.ty),
                        bound: o.bound.clone(),
                    })
                    .collect(),
                array_size: c.array_size,
            }),
        }
    }
}

/// Replace the given variables throughout a type. Used to instantiate
/// generic signatures with fresh variables.
pub fn substitute(ty: &Type, map: &HashMap<VarId, Type>) -> Type {
    match ty {
        Type::Var(v) => map.get(&v.id).cloned().unwrap_or_else(|| ty.clone()),
        Type::Con(c) => Type::Con(Concrete {
            con: c.con.clone(),
            params: c.params.iter().map(|p| substitute(p, map)).collect(),
            obligations: c
                .obligations
                .iter()
                .map(|o| Obligation {
                    ty: substitute(&o.ty, map),
                    bound: o.bound.clone(),
                })
                .collect(),
            array_size: c.array_size,
        }),
    }
}

/// Build a map from each of `vars` to a fresh variable with the same name
/// and traits.
pub fn freshen(infer: &InferContext, vars: &[TyVar]) -> HashMap<VarId, Type> {
    vars.iter()
        .map(|v| (v.id, infer.fresh_var(&v.name, v.traits.clone())))
        .collect()
}

/// The unification engine for one checking unit.
#[derive(Debug, Clone)]
pub struct Unifier {
    subst: Substitution,
    infer: InferContext,
}

impl Unifier {
    pub fn new(infer: InferContext) -> Self {
        Self {
            subst: Substitution::new(),
            infer,
        }
    }

    pub fn substitution(&self) -> &Substitution {
        &self.subst
    }

    /// Resolve a type as far as the current bindings allow.
    pub fn resolve(&self, ty: &Type) -> Type {
        self.subst.apply(ty)
    }

    /// Resolve a type that must not contain any variable.
    pub fn must_resolve(&self, ty: &Type) -> Result<Type, TypeErrorKind> {
        let ty = self.resolve(ty);
        if ty.has_vars() {
            return Err(TypeErrorKind::UnboundType(ty));
        }
        Ok(ty)
    }

    /// Unify two types, returning the type both now stand for. `expected`
    /// and `found` only decide how a mismatch is reported.
    pub fn unify(
        &mut self,
        traits: &TraitRegistry,
        expected: &Type,
        found: &Type,
    ) -> Result<Type, TypeErrorKind> {
        let left = self.subst.deref(expected);
        let right = self.subst.deref(found);

        match (left, right) {
            (Type::Var(a), Type::Var(b)) if a.id == b.id => Ok(Type::Var(a)),
            (Type::Var(a), Type::Var(b)) => {
                let bounds: BTreeSet<_> = a.traits.union(&b.traits).cloned().collect();
                let merged = self.infer.fresh_var(&a.name, bounds);
                trace!(left = %Type::Var(a.clone()), right = %Type::Var(b.clone()), %merged, "merge variables");
                self.subst.insert(a.id, merged.clone());
                self.subst.insert(b.id, merged.clone());
                Ok(merged)
            }
            (Type::Var(v), Type::Con(c)) | (Type::Con(c), Type::Var(v)) => self.bind(traits, v, c),
            (Type::Con(a), Type::Con(b)) => {
                if a.con != b.con
                    || a.params.len() != b.params.len()
                    || a.array_size != b.array_size
                    || a.obligations.len() != b.obligations.len()
                    || a
                        .obligations
                        .iter()
                        .zip(&b.obligations)
                        .any(|(x, y)| x.bound != y.bound)
                {
                    return Err(self.mismatch(expected, found));
                }

                let mut params = Vec::with_capacity(a.params.len());
                for (x, y) in a.params.iter().zip(&b.params) {
                    params.push(self.unify(traits, x, y)?);
                }
                let mut obligations = Vec::with_capacity(a.obligations.len());
                for (x, y) in a.obligations.iter().zip(&b.obligations) {
                    obligations.push(Obligation {
                        ty: self.unify(traits, &x.ty, &y.ty)?,
                        bound: x.bound.clone(),
                    });
                }

                Ok(Type::Con(Concrete {
                    con: a.con,
                    params,
                    obligations,
                    array_size: a.array_size,
                }))
            }
        }
    }

    fn bind(&mut self, traits: &TraitRegistry, var: TyVar, con: Concrete) -> Result<Type, TypeErrorKind> {
        let ty = self.resolve(&Type::Con(con));
        if ty.mentions(var.id) {
            return Err(TypeErrorKind::InfiniteType {
                var: Type::Var(var),
                ty,
            });
        }
        if let Type::Con(c) = &ty {
            for bound in &var.traits {
                if traits.lookup(&c.con, bound).is_none() {
                    return Err(TypeErrorKind::TraitMismatch {
                        ty: ty.clone(),
                        bound: bound.clone(),
                    });
                }
            }
        }
        trace!(var = %Type::Var(var.clone()), %ty, "bind");
        self.subst.insert(var.id, ty.clone());
        Ok(ty)
    }

    fn mismatch(&self, expected: &Type, found: &Type) -> TypeErrorKind {
        TypeErrorKind::TypeMismatch {
            expected: self.resolve(expected),
            found: self.resolve(found),
        }
    }
}

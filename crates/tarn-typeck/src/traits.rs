//! Trait declarations and implementation evidence.
//! 特征声明与实现证据。
//!
//! Evidence is keyed by the type constructor alone. Built-in evidence may
//! cover every instantiation of a constructor; user impls only target
//! types without type arguments, so the key identifies them exactly.

use std::collections::HashMap;

use indexmap::IndexMap;
use tarn_ir::{BindingId, Trait, TyCon, TyVar, Type};

use crate::errors::TypeErrorKind;

/// Proof that a type implements a trait, as the caller has to pass it.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    /// Supplied by the backend for built-in types.
    Intrinsic { bound: Trait, ty: String },
    /// A dictionary held in a binding: an impl's method table, or the
    /// obligation parameter of the enclosing generic function.
    Binding { name: String, binding: BindingId },
}

impl Evidence {
    pub fn intrinsic(bound: &str, ty: &str) -> Self {
        Evidence::Intrinsic {
            bound: Trait::new(bound),
            ty: ty.to_string(),
        }
    }
}

/// A declared trait.
#[derive(Debug, Clone)]
pub struct TraitInfo {
    pub name: Trait,
    /// The `Self` variable the method signatures are written against.
    pub self_var: TyVar,
    /// Method signatures in declaration order; the position is the slot in
    /// every implementing dictionary.
    pub methods: IndexMap<String, Type>,
}

impl TraitInfo {
    pub fn method(&self, name: &str) -> Option<(usize, &Type)> {
        self.methods.get_full(name).map(|(index, _, ty)| (index, ty))
    }
}

/// Registry of traits and of which types implement them.
#[derive(Debug, Clone, Default)]
pub struct TraitRegistry {
    traits: HashMap<Trait, TraitInfo>,
    evidence: HashMap<(TyCon, Trait), Evidence>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, info: TraitInfo) -> Result<(), TypeErrorKind> {
        if self.traits.contains_key(&info.name) {
            return Err(TypeErrorKind::DuplicateDeclaration(info.name.0));
        }
        self.traits.insert(info.name.clone(), info);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TraitInfo> {
        self.traits.get(&Trait::new(name))
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Record evidence that `ty` implements `bound`.
    pub fn provide(&mut self, ty: &Type, bound: Trait, evidence: Evidence) -> Result<(), TypeErrorKind> {
        let Type::Con(c) = ty else {
            return Err(TypeErrorKind::UnboundType(ty.clone()));
        };
        let key = (c.con.clone(), bound);
        if self.evidence.contains_key(&key) {
            return Err(TypeErrorKind::DuplicateImpl {
                ty: ty.clone(),
                bound: key.1,
            });
        }
        self.evidence.insert(key, evidence);
        Ok(())
    }

    pub fn lookup(&self, con: &TyCon, bound: &Trait) -> Option<&Evidence> {
        self.evidence.get(&(con.clone(), bound.clone()))
    }

    /// Find the evidence a call must pass for `ty: bound`.
    pub fn require(&self, ty: &Type, bound: &Trait) -> Result<Evidence, TypeErrorKind> {
        match ty {
            Type::Var(_) => Err(TypeErrorKind::UnboundType(ty.clone())),
            Type::Con(c) => self.lookup(&c.con, bound).cloned().ok_or_else(|| {
                TypeErrorKind::MissingImpl {
                    ty: ty.clone(),
                    bound: bound.clone(),
                }
            }),
        }
    }

    pub fn implements(&self, ty: &Type, bound: &Trait) -> bool {
        self.require(ty, bound).is_ok()
    }
}

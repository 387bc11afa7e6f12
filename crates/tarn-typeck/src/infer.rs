//! Fresh type variables and tracer identities.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use tarn_ir::{Trait, TyVar, Type, VarId};

/// Counter for fresh type variables. Clones share the counter, so every
/// unifier of one checking session draws from the same sequence.
#[derive(Debug, Clone, Default)]
pub struct InferContext {
    next: Rc<Cell<u32>>,
}

impl InferContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_id(&self) -> u32 {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }

    /// Create a fresh type variable.
    pub fn fresh_var(&self, name: &str, traits: BTreeSet<Trait>) -> Type {
        Type::Var(self.fresh_tyvar(name, traits))
    }

    pub fn fresh_tyvar(&self, name: &str, traits: BTreeSet<Trait>) -> TyVar {
        TyVar {
            id: VarId(self.fresh_id()),
            name: name.to_string(),
            traits,
        }
    }
}

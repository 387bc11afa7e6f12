//! Typed intermediate representation for Tarn.
//!
//! The type checker turns a syntax tree into this IR; the bytecode compiler
//! consumes it. Identifiers are unique [`BindingId`]s, never source names,
//! and every expression carries its checked [`Type`].

mod ir;
mod ty;

pub use ir::*;
pub use ty::*;

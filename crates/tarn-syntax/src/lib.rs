//! Syntax tree definitions for Tarn.
//!
//! The parser produces these nodes and the type checker consumes them. The
//! [`build`] module offers terse constructors for trees assembled in code.

mod ast;
pub mod build;
mod expr;
mod types;

pub use ast::*;
pub use expr::*;
pub use types::*;

use tarn_common::Spanned;

/// A name together with where it was written.
pub type Name = Spanned<String>;

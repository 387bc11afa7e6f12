//! Common utilities and data structures for Tarn.
//!
//! - `Span`: byte ranges into the source text
//! - `Spanned<T>`: a value tagged with the span it came from

mod span;

pub use span::{BytePos, Span, Spanned};

//! Type errors and their diagnostics.
//!
//! Checking stops at the first failure. Every failure is a [`TypeError`]:
//! a [`TypeErrorKind`] naming what went wrong plus the span it happened at.

use tarn_common::Span;
use tarn_diagnostic::{Diagnostic, ErrorCode, Label};
use tarn_ir::{Trait, Type};
use thiserror::Error;

pub type Result<T, E = TypeError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeErrorKind {
    #[error("mismatched types: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: Type, found: Type },

    #[error("the trait `{bound}` is not satisfied by `{ty}`")]
    TraitMismatch { ty: Type, bound: Trait },

    #[error("no implementation of `{bound}` for `{ty}`")]
    MissingImpl { ty: Type, bound: Trait },

    #[error("`{bound}` is already implemented for `{ty}`")]
    DuplicateImpl { ty: Type, bound: Trait },

    #[error("type annotations needed: `{0}` is not fully known here")]
    UnboundType(Type),

    #[error("cannot infer the return type of this call (found `{0}`)")]
    UnboundReturn(Type),

    #[error("cannot find value `{0}` in this scope")]
    UnknownIdentifier(String),

    #[error("cannot find type `{0}` in this scope")]
    UnknownType(String),

    #[error("`{ty}` has no field `{field}`")]
    UnknownField { ty: Type, field: String },

    #[error("enum `{ty}` has no case `{tag}`")]
    UnknownCaseTag { ty: String, tag: String },

    #[error("`{method}` is not a method of trait `{bound}`")]
    UnknownMethod { bound: Trait, method: String },

    #[error("field `{0}` is specified more than once")]
    DuplicateField(String),

    #[error("case `{0}` is matched more than once")]
    DuplicateCase(String),

    #[error("`{0}` is declared more than once")]
    DuplicateDeclaration(String),

    #[error("missing field `{field}` in `{ty}`")]
    MissingField { ty: String, field: String },

    #[error("match on `{ty}` does not cover case `{tag}`")]
    IncompleteMatch { ty: String, tag: String },

    #[error("missing method `{method}` in impl of `{bound}`")]
    MissingMethod { bound: Trait, method: String },

    #[error("expected {expected} {what}, found {found}")]
    ArityMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{0}")]
    InvalidContext(String),

    #[error("cannot infer the type of this closure without an expected function type")]
    MissingTypeContext,

    #[error("index {index} is out of bounds for `{ty}`")]
    IndexOutOfBounds { ty: Type, index: usize },

    #[error("cannot construct infinite type: `{var}` occurs in `{ty}`")]
    InfiniteType { var: Type, ty: Type },

    #[error("expected a function, found `{0}`")]
    NotAFunction(Type),

    #[error("expected an enum value, found `{0}`")]
    ExpectedEnum(Type),

    #[error("cannot iterate over `{0}`; expected an array")]
    NotIterable(Type),
}

impl TypeErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            TypeErrorKind::TypeMismatch { .. } | TypeErrorKind::NotIterable(_) => {
                ErrorCode::TypeMismatch
            }
            TypeErrorKind::TraitMismatch { .. } => ErrorCode::TraitMismatch,
            TypeErrorKind::MissingImpl { .. } => ErrorCode::MissingImpl,
            TypeErrorKind::DuplicateImpl { .. } => ErrorCode::DuplicateImpl,
            TypeErrorKind::UnboundType(_) => ErrorCode::UnboundType,
            TypeErrorKind::UnboundReturn(_) => ErrorCode::UnboundReturn,
            TypeErrorKind::UnknownIdentifier(_) => ErrorCode::UnknownIdentifier,
            TypeErrorKind::UnknownType(_) => ErrorCode::UnknownType,
            TypeErrorKind::UnknownField { .. } => ErrorCode::UnknownField,
            TypeErrorKind::UnknownCaseTag { .. } => ErrorCode::UnknownCaseTag,
            TypeErrorKind::UnknownMethod { .. } => ErrorCode::UnknownMethod,
            TypeErrorKind::DuplicateField(_) => ErrorCode::DuplicateField,
            TypeErrorKind::DuplicateCase(_) => ErrorCode::DuplicateCase,
            TypeErrorKind::DuplicateDeclaration(_) => ErrorCode::DuplicateDeclaration,
            TypeErrorKind::MissingField { .. } => ErrorCode::MissingField,
            TypeErrorKind::IncompleteMatch { .. } => ErrorCode::IncompleteMatch,
            TypeErrorKind::MissingMethod { .. } => ErrorCode::MissingMethod,
            TypeErrorKind::ArityMismatch { .. } => ErrorCode::ArityMismatch,
            TypeErrorKind::InvalidContext(_) => ErrorCode::InvalidContext,
            TypeErrorKind::MissingTypeContext => ErrorCode::MissingTypeContext,
            TypeErrorKind::IndexOutOfBounds { .. } => ErrorCode::IndexOutOfBounds,
            TypeErrorKind::InfiniteType { .. } => ErrorCode::InfiniteType,
            TypeErrorKind::NotAFunction(_) => ErrorCode::NotAFunction,
            TypeErrorKind::ExpectedEnum(_) => ErrorCode::ExpectedEnum,
        }
    }

    /// A trait bound that no evidence satisfies, whether found while
    /// binding a variable or while resolving an obligation.
    pub fn is_trait_failure(&self) -> bool {
        matches!(
            self,
            TypeErrorKind::TraitMismatch { .. } | TypeErrorKind::MissingImpl { .. }
        )
    }

    pub fn at(self, span: Span) -> TypeError {
        TypeError { kind: self, span }
    }
}

/// A type error at a source location.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
}

impl TypeError {
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Build a labeled diagnostic for rendering.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.span, self.kind.to_string())
            .with_code(self.code());

        match &self.kind {
            TypeErrorKind::TypeMismatch { expected, found } => {
                let diag = diag.with_label(Label::new(
                    self.span,
                    format!("expected `{expected}`, found `{found}`"),
                ));
                add_type_mismatch_help(diag, expected, found)
            }
            TypeErrorKind::TraitMismatch { ty, bound } | TypeErrorKind::MissingImpl { ty, bound } => diag
                .with_label(Label::new(self.span, format!("`{ty}` does not implement `{bound}`")))
                .with_help(format!("add `impl {bound} for {ty}`, or use a type that implements it")),
            TypeErrorKind::UnknownIdentifier(name) => {
                diag.with_label(Label::new(self.span, format!("`{name}` not found in this scope")))
            }
            TypeErrorKind::ArityMismatch { expected, what, .. } => {
                diag.with_label(Label::new(self.span, format!("expected {expected} {what}")))
            }
            TypeErrorKind::IncompleteMatch { tag, .. } => diag
                .with_label(Label::new(self.span, format!("case `{tag}` not covered")))
                .with_note("every enum case must be matched exactly once"),
            TypeErrorKind::InfiniteType { .. } => {
                diag.with_note("this would create a recursive type that is infinite in size")
            }
            _ => diag.with_label(Label::new(self.span, self.code().description())),
        }
    }
}

/// Add helpful notes for common type mismatches.
fn add_type_mismatch_help(diag: Diagnostic, expected: &Type, found: &Type) -> Diagnostic {
    use tarn_ir::{FLOAT, INT};

    if expected.is_named(INT) && found.is_named(FLOAT) {
        return diag.with_note("Tarn never converts between Float and Int implicitly");
    }
    if expected.is_named(FLOAT) && found.is_named(INT) {
        return diag.with_help("write the literal with a decimal point, e.g. `1.0`");
    }
    if found.is_void() {
        return diag.with_note("this expression does not produce a value");
    }
    match (expected.as_func(), found.as_func()) {
        (Some((_, exp, _)), Some((_, got, _))) if exp.len() != got.len() => diag.with_note(format!(
            "expected function with {} parameter(s), found function with {} parameter(s)",
            exp.len(),
            got.len()
        )),
        _ => diag,
    }
}

/// Attach a span to a span-less failure.
pub(crate) trait At<T> {
    fn at(self, span: Span) -> Result<T>;
}

impl<T> At<T> for std::result::Result<T, TypeErrorKind> {
    fn at(self, span: Span) -> Result<T> {
        self.map_err(|kind| kind.at(span))
    }
}

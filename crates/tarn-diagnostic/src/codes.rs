//! Error codes for Tarn diagnostics.

/// Stable codes for type checking failures (E0200 - E0299).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TypeMismatch,
    TraitMismatch,
    MissingImpl,
    DuplicateImpl,
    UnboundType,
    UnboundReturn,
    UnknownIdentifier,
    UnknownType,
    UnknownField,
    UnknownCaseTag,
    UnknownMethod,
    DuplicateField,
    DuplicateCase,
    DuplicateDeclaration,
    MissingField,
    IncompleteMatch,
    MissingMethod,
    ArityMismatch,
    InvalidContext,
    MissingTypeContext,
    IndexOutOfBounds,
    InfiniteType,
    NotAFunction,
    ExpectedEnum,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TypeMismatch => "E0200",
            ErrorCode::TraitMismatch => "E0201",
            ErrorCode::MissingImpl => "E0202",
            ErrorCode::DuplicateImpl => "E0203",
            ErrorCode::UnboundType => "E0204",
            ErrorCode::UnboundReturn => "E0205",
            ErrorCode::UnknownIdentifier => "E0206",
            ErrorCode::UnknownType => "E0207",
            ErrorCode::UnknownField => "E0208",
            ErrorCode::UnknownCaseTag => "E0209",
            ErrorCode::UnknownMethod => "E0210",
            ErrorCode::DuplicateField => "E0211",
            ErrorCode::DuplicateCase => "E0212",
            ErrorCode::DuplicateDeclaration => "E0213",
            ErrorCode::MissingField => "E0214",
            ErrorCode::IncompleteMatch => "E0215",
            ErrorCode::MissingMethod => "E0216",
            ErrorCode::ArityMismatch => "E0217",
            ErrorCode::InvalidContext => "E0218",
            ErrorCode::MissingTypeContext => "E0219",
            ErrorCode::IndexOutOfBounds => "E0220",
            ErrorCode::InfiniteType => "E0221",
            ErrorCode::NotAFunction => "E0222",
            ErrorCode::ExpectedEnum => "E0223",
        }
    }

    /// Get a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::TypeMismatch => "mismatched types",
            ErrorCode::TraitMismatch => "type does not satisfy a trait bound",
            ErrorCode::MissingImpl => "trait is not implemented for type",
            ErrorCode::DuplicateImpl => "trait is implemented twice for the same type",
            ErrorCode::UnboundType => "type could not be inferred",
            ErrorCode::UnboundReturn => "return type could not be inferred",
            ErrorCode::UnknownIdentifier => "cannot find value in this scope",
            ErrorCode::UnknownType => "cannot find type in this scope",
            ErrorCode::UnknownField => "no such field",
            ErrorCode::UnknownCaseTag => "no such enum case",
            ErrorCode::UnknownMethod => "method is not a member of the trait",
            ErrorCode::DuplicateField => "field specified more than once",
            ErrorCode::DuplicateCase => "enum case matched more than once",
            ErrorCode::DuplicateDeclaration => "name declared more than once",
            ErrorCode::MissingField => "missing field in construction",
            ErrorCode::IncompleteMatch => "match does not cover every case",
            ErrorCode::MissingMethod => "missing required method in trait implementation",
            ErrorCode::ArityMismatch => "wrong number of arguments",
            ErrorCode::InvalidContext => "construct used outside of a valid context",
            ErrorCode::MissingTypeContext => "closure needs a known function type",
            ErrorCode::IndexOutOfBounds => "index out of bounds",
            ErrorCode::InfiniteType => "cannot construct infinite type",
            ErrorCode::NotAFunction => "expected a function, found a different type",
            ErrorCode::ExpectedEnum => "expected an enum value",
        }
    }

    /// Get a suggested fix for the error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ErrorCode::UnknownIdentifier => Some("check the spelling or ensure the value is in scope"),
            ErrorCode::UnknownType => Some("check the spelling or declare the type before use"),
            ErrorCode::MissingField => Some("add the missing field to the construction"),
            ErrorCode::IncompleteMatch => Some("add a case for every enum tag"),
            ErrorCode::MissingMethod => Some("implement all methods declared by the trait"),
            ErrorCode::MissingTypeContext => Some("pass the closure where a function type is expected, or annotate the binding"),
            ErrorCode::UnboundReturn => Some("annotate the return type"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_type_range() {
        for code in [ErrorCode::TypeMismatch, ErrorCode::ExpectedEnum, ErrorCode::IncompleteMatch] {
            assert!(code.as_str().starts_with("E02"));
            assert!(!code.description().is_empty());
        }
    }
}

//! CFI error types
//!
//! Two kinds of failure exist: malformed input rejected by the parser, and
//! compositions (append, range construction) that have no well-defined result.

use thiserror::Error;

/// Result type alias for CFI operations
pub type Result<T> = std::result::Result<T, CfiError>;

/// Errors raised while parsing or composing CFIs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfiError {
    /// The text is not a valid CFI. `fragment` is the offending substring.
    #[error("Invalid CFI `{fragment}`: {kind}")]
    Invalid {
        fragment: String,
        kind: ParseErrorKind,
    },

    /// The operands cannot be combined
    #[error("Invalid CFI composition: {0}")]
    Composition(#[from] CompositionError),
}

/// Grammar violations detected by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("empty CFI string")]
    Empty,

    #[error("missing closing ')'")]
    MissingClosingParen,

    #[error("empty step")]
    EmptyStep,

    #[error("expected a step index")]
    ExpectedNumber,

    #[error("step index out of range")]
    IndexOverflow,

    #[error("unclosed '[' assertion")]
    UnclosedBracket,

    #[error("unexpected '[' inside assertion")]
    UnexpectedBracket,

    #[error("invalid character offset")]
    InvalidCharacterOffset,

    #[error("invalid temporal offset")]
    InvalidTemporalOffset,

    #[error("invalid spatial offset")]
    InvalidSpatialOffset,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("text qualifier requires a character offset")]
    OrphanTextQualifier,

    #[error("step carries two text qualifiers")]
    DuplicateTextQualifier,

    #[error("indirection step cannot carry an offset")]
    OffsetOnIndirector,

    #[error("expected 0 or 2 top-level ',' separators, found {0}")]
    RangeSeparators(usize),

    #[error("range start and end paths must not be empty")]
    EmptyRangeSuffix,

    #[error("offset or indirection has no step to attach to")]
    DanglingOffset,
}

/// Compositions that are rejected rather than guessed at
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("cannot append to a ranged CFI")]
    AppendToRange,

    #[error("cannot append a ranged CFI")]
    AppendRange,

    #[error("range operands must not themselves be ranges")]
    NestedRange,

    #[error("range endpoint `{0}` does not start with the shared prefix")]
    PrefixMismatch(String),

    #[error("range endpoints must extend past the shared prefix")]
    EmptySuffix,
}

impl CfiError {
    pub(crate) fn invalid(fragment: impl Into<String>, kind: ParseErrorKind) -> Self {
        CfiError::Invalid {
            fragment: fragment.into(),
            kind,
        }
    }

    /// The grammar violation, if this is a parse failure
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            CfiError::Invalid { kind, .. } => Some(*kind),
            CfiError::Composition(_) => None,
        }
    }

    /// Check if this error was raised by a rejected composition
    pub fn is_composition(&self) -> bool {
        matches!(self, CfiError::Composition(_))
    }
}

//! Error types for the treebind core library.

use crate::model::qname::QName;

/// Top-level error enum for the treebind core library.
///
/// Conversion-level errors (`InvalidValue`, `ConstraintViolation`,
/// `NoMatchingMember`, `UnresolvableReference`) are always surfaced to the
/// immediate caller of the failing codec call. Tree-structure errors are
/// split in two: `IncorrectNesting` is a programmer error, while
/// `MissingSchema` suggests a stale or partial schema context and may be
/// resolved by reloading the schema.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid value {value} for {type_name}: expected one of [{}]", allowed.join(", "))]
    InvalidValue {
        type_name: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("value {value} violates constraint of {type_name}: {constraint}")]
    ConstraintViolation {
        type_name: String,
        value: String,
        constraint: String,
    },

    #[error("value {value} matches no member of union {type_name}")]
    NoMatchingMember { type_name: String, value: String },

    #[error("reference {reference} cannot be resolved in the active schema context")]
    UnresolvableReference { reference: String },

    #[error("{child} is not a valid child of {parent}")]
    IncorrectNesting { child: String, parent: String },

    #[error("module {module} is not present in the active schema context")]
    MissingSchema { module: String },

    #[error("malformed path at offset {offset}: {reason}")]
    MalformedPath { offset: usize, reason: String },

    #[error("duplicate child {qname}")]
    DuplicateChild { qname: QName },
}

pub type CodecResult<T> = Result<T, CodecError>;

impl CodecError {
    /// True when a schema reload might resolve the failure.
    pub fn is_schema_related(&self) -> bool {
        matches!(self, CodecError::MissingSchema { .. })
    }
}

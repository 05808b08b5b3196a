use thiserror::Error;

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Error type covering every failure a codec call can surface.
///
/// All failures propagate synchronously to the caller of `encode`/`decode`;
/// nothing is retried and no partially materialized graph is ever returned.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A field name was added twice to one [`FieldBag`](crate::FieldBag).
    /// Each object must declare each field exactly once.
    #[error("duplicate field {name:?} in field bag")]
    DuplicateField { name: String },

    /// A stored value could not be converted to the requested type.
    #[error("cannot read {found} value as {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A type name (or an encoded object's runtime type) has no registry
    /// entry. At decode time this usually means a missing registration or
    /// an unresolved rename.
    #[error("type not found in registry: {name:?}")]
    TypeNotFound { name: String },

    /// A reference named an identifier that is never declared anywhere in
    /// the document.
    #[error("reference target {id:?} is never declared")]
    UnresolvedReference { id: String },

    /// The decoded root's dynamic type is incompatible with the caller's
    /// expected type.
    #[error("decoded root is a {found}, not a {expected}")]
    TypeCast {
        expected: &'static str,
        found: &'static str,
    },

    /// `set_field` named a field the target type does not declare.
    #[error("{type_path} has no settable field {name:?}")]
    UnknownField {
        type_path: &'static str,
        name: String,
    },

    /// A name or type was registered twice.
    #[error("type {name:?} is already registered")]
    DuplicateType { name: String },

    /// NaN or infinity reached the writer; JSON has no representation for
    /// non-finite floats.
    #[error("non-finite float cannot be represented in the document")]
    NonFiniteNumber,

    /// A tree node is structurally invalid (missing `id`/`type`, `values`
    /// under a non-sequence type, a plain map, ...). Corrupt documents are
    /// rejected wholesale rather than partially materialized.
    #[error("malformed node: {0}")]
    MalformedNode(String),

    /// Text-level parse or print failure from the tree-format library.
    #[error("document syntax: {0}")]
    Json(#[from] serde_json::Error),
}

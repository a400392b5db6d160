use std::borrow::Cow;
use std::io;
use thiserror::Error;

/// A record cannot be routed to a destination table.
///
/// Raised before any schema work for the record. Never retried — a
/// classification failure is a structural mismatch between the live data and
/// the routing rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("record is missing key attribute `{which}`")]
    MissingKey { which: &'static str },

    #[error("key attribute `{which}` must be a string, found `{found}`")]
    WrongType {
        which: &'static str,
        found: &'static str,
    },

    #[error("no routing rule matches record (pk: {pk}, sk: {sk})")]
    Unmatched { pk: String, sk: String },
}

/// A value cannot be represented in the columnar schema model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("cannot derive a column type for null value at `{field}`")]
    NullValue { field: String },

    #[error("array at `{field}` mixes element types: [{found}]")]
    HeterogeneousArray { field: String, found: String },

    #[error("empty array at `{field}` cannot be typed")]
    EmptyArray { field: String },

    #[error("unsupported value at `{field}`: {details}")]
    UnsupportedKind {
        field: String,
        details: Cow<'static, str>,
    },
}

/// A classification or schema error with batch-position context.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("record {position}: {source}")]
    Classification {
        position: usize,
        #[source]
        source: ClassificationError,
    },

    #[error("record {position} (destination {table}): {source}")]
    Schema {
        position: usize,
        table: String,
        #[source]
        source: SchemaError,
    },
}

impl AssemblyError {
    /// Index of the offending record within the batch.
    pub fn position(&self) -> usize {
        match self {
            AssemblyError::Classification { position, .. } => *position,
            AssemblyError::Schema { position, .. } => *position,
        }
    }
}

/// Reported by a sink on insertion failure; opaque to the core.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("connection error: {details}")]
    Connect { details: Cow<'static, str> },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SinkError {
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::Connect { .. } => "connect error",
            SinkError::Io(_) => "io error",
            SinkError::Serialization(_) => "serialization error",
            SinkError::Other(_) => "other error",
        }
    }
}

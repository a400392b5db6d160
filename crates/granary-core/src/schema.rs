//! Columnar schema tree.
//!
//! [`FieldSchema`] is the shape handed to the sink collaborator: a tree of
//! named, typed fields with nested records and repeated (array) fields. The
//! serde form is `{name, type, mode, fields?}` recursively and must
//! round-trip through the sink's schema-description format unchanged.

use serde::{Deserialize, Serialize};

/// Column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    Numeric,
    String,
    Record,
    Bytes,
}

impl FieldType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldType::Boolean => "BOOLEAN",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Numeric => "NUMERIC",
            FieldType::String => "STRING",
            FieldType::Record => "RECORD",
            FieldType::Bytes => "BYTES",
        }
    }
}

/// Column mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    Nullable,
    Required,
    Repeated,
}

impl FieldMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Nullable => "NULLABLE",
            FieldMode::Required => "REQUIRED",
            FieldMode::Repeated => "REPEATED",
        }
    }
}

/// One column of a destination table.
///
/// Children are present only for record-typed fields and carry
/// case-insensitively unique names. A repeated field of scalar type has no
/// children; a repeated record's children are the deduplicated union of all
/// per-element field sets seen during inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub mode: FieldMode,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
}

impl FieldSchema {
    /// A nullable scalar column.
    pub fn scalar(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Nullable,
            fields: Vec::new(),
        }
    }

    /// A nullable record column with the given children.
    pub fn record(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Record,
            mode: FieldMode::Nullable,
            fields,
        }
    }

    /// Same column with a different mode.
    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_repeated(&self) -> bool {
        self.mode == FieldMode::Repeated
    }
}

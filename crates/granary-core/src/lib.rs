//! Granary Core Types
//!
//! This crate defines the change-event structure, the attribute value model,
//! the columnar schema tree, and the traits shared across the Granary
//! pipeline. Change events are wire-compatible with the source keyed store's
//! stream encoding, so an already-validated event batch deserializes straight
//! into [`ChangeEvent`] values.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod errors;
mod schema;
mod value;

pub use errors::{
    AssemblyError, ClassificationError, SchemaError, SinkError,
};
pub use schema::{FieldMode, FieldSchema, FieldType};
pub use value::AttributeValue;

/// Attribute name of the partition key in the keys map.
pub const PARTITION_KEY_ATTR: &str = "pk";

/// Attribute name of the sort key in the keys map.
pub const SORT_KEY_ATTR: &str = "sk";

/// Delimiter between segments of a composite key.
pub const KEY_SEGMENT_DELIMITER: char = '#';

// ============================================================================
// Event Kind
// ============================================================================

/// Kind of mutation a change event notifies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Insert,
    Modify,
    Remove,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::Insert => "INSERT",
            EventKind::Modify => "MODIFY",
            EventKind::Remove => "REMOVE",
        }
    }
}

// ============================================================================
// Stream View Type
// ============================================================================

/// Declares which row images a stream record carries.
///
/// Image access goes through [`StreamRecord::new_image`] /
/// [`StreamRecord::old_image`], which return `None` for images the view type
/// declares absent — even if a producer populated the field anyway.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamViewType {
    KeysOnly,
    NewImage,
    OldImage,
    NewAndOldImages,
}

impl StreamViewType {
    pub const fn has_new_image(&self) -> bool {
        matches!(
            self,
            StreamViewType::NewImage | StreamViewType::NewAndOldImages
        )
    }

    pub const fn has_old_image(&self) -> bool {
        matches!(
            self,
            StreamViewType::OldImage | StreamViewType::NewAndOldImages
        )
    }
}

// ============================================================================
// Change Events
// ============================================================================

/// An attribute map: row image or key set.
pub type AttributeMap = IndexMap<String, AttributeValue>;

/// The mutation payload of one change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamRecord {
    /// Source-side creation time, seconds since epoch as on the wire.
    pub approximate_creation_date_time: f64,

    /// Composite key attributes of the mutated item.
    pub keys: AttributeMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_image: Option<AttributeMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    old_image: Option<AttributeMap>,

    pub sequence_number: String,

    pub size_bytes: u64,

    pub stream_view_type: StreamViewType,
}

impl StreamRecord {
    /// Row image after the change, when the view type carries one.
    pub fn new_image(&self) -> Option<&AttributeMap> {
        if self.stream_view_type.has_new_image() {
            self.new_image.as_ref()
        } else {
            None
        }
    }

    /// Row image before the change, when the view type carries one.
    pub fn old_image(&self) -> Option<&AttributeMap> {
        if self.stream_view_type.has_old_image() {
            self.old_image.as_ref()
        } else {
            None
        }
    }

    /// Extract the composite change key from the keys map.
    pub fn change_key(&self) -> Result<ChangeKey, ClassificationError> {
        ChangeKey::from_keys(&self.keys)
    }
}

/// Builder-style constructor used by tests and synthetic producers.
impl StreamRecord {
    pub fn new(
        keys: AttributeMap,
        view_type: StreamViewType,
        approximate_creation_date_time: f64,
    ) -> Self {
        Self {
            approximate_creation_date_time,
            keys,
            new_image: None,
            old_image: None,
            sequence_number: String::new(),
            size_bytes: 0,
            stream_view_type: view_type,
        }
    }

    pub fn with_new_image(mut self, image: AttributeMap) -> Self {
        self.new_image = Some(image);
        self
    }

    pub fn with_old_image(mut self, image: AttributeMap) -> Self {
        self.old_image = Some(image);
        self
    }

    pub fn with_sequence_number(mut self, seq: impl Into<String>) -> Self {
        self.sequence_number = seq.into();
        self
    }
}

/// One notified mutation from the source keyed store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Stream-assigned event identifier.
    #[serde(rename = "eventId")]
    pub event_id: String,

    /// Insert / modify / remove.
    #[serde(rename = "kind")]
    pub kind: EventKind,

    /// The mutation payload.
    #[serde(rename = "record")]
    pub record: StreamRecord,
}

impl ChangeEvent {
    pub fn new(
        event_id: impl Into<String>,
        kind: EventKind,
        record: StreamRecord,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
            record,
        }
    }
}

// ============================================================================
// Change Key
// ============================================================================

/// The composite (partition, sort) key pair of one record.
///
/// Both parts encode a type/category via `#`-delimited segments, e.g.
/// `patient#01F...` / `assessment#adhd#...#result`. Both must be string-typed
/// attributes; absence or a wrong variant is a classification failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl ChangeKey {
    pub fn new(
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Extract the key pair from a keys map, validating both attributes are
    /// present and string-typed.
    pub fn from_keys(
        keys: &AttributeMap,
    ) -> Result<Self, ClassificationError> {
        let partition_key = string_key(keys, PARTITION_KEY_ATTR)?;
        let sort_key = string_key(keys, SORT_KEY_ATTR)?;
        Ok(Self {
            partition_key,
            sort_key,
        })
    }
}

fn string_key(
    keys: &AttributeMap,
    which: &'static str,
) -> Result<String, ClassificationError> {
    let value = keys
        .get(which)
        .ok_or(ClassificationError::MissingKey { which })?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or(ClassificationError::WrongType {
            which,
            found: value.kind(),
        })
}

// ============================================================================
// Sink Trait
// ============================================================================

pub type SinkResult<T> = Result<T, SinkError>;

/// Destination-store insertion collaborator.
///
/// Implementations own the actual I/O: table creation if absent and
/// per-insert error semantics. The core makes no delivery guarantee beyond
/// "at least attempted once per invocation" and never retries.
#[async_trait]
pub trait TableSink: Send + Sync {
    fn id(&self) -> &str;

    /// Insert a batch of rows into `table` under `schema`.
    async fn insert(
        &self,
        table: &str,
        schema: &[FieldSchema],
        rows: &[Value],
    ) -> SinkResult<()>;
}

pub type ArcDynTableSink = Arc<dyn TableSink>;

// ============================================================================
// Tests
// ============================================================================

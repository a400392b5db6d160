//! Batch assembly: change events → per-destination row buckets.
//!
//! The assembler walks an event batch strictly in arrival order, classifies
//! each record's composite key, and buckets materialized rows per
//! destination table. The first record routed to a destination seeds that
//! destination's schema for the whole batch; later records in the same batch
//! do not revise it. That is a documented limitation: within one invocation,
//! every row queued for a destination is structurally compatible with the
//! bucket schema only as long as the producer keeps shapes homogeneous per
//! destination per batch.
//!
//! State is per-invocation only — buckets are created fresh per batch and
//! handed off for flushing; nothing is shared across invocations.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use granary_config::{BadRecordPolicy, Policies};
use granary_core::{
    AssemblyError, AttributeMap, AttributeValue, ChangeEvent, FieldSchema,
};
use granary_routing::classify;
use granary_schema::{compute_fingerprint, infer_object};

/// One destination's share of a batch: the seeded schema and the ordered
/// row queue.
#[derive(Debug, Clone)]
pub struct TableBucket {
    pub schema: Vec<FieldSchema>,

    /// Structural fingerprint of `schema`, for log correlation.
    pub fingerprint: String,

    pub rows: Vec<Value>,
}

/// Output of one assembly pass, ready to flush.
#[derive(Debug)]
pub struct Assembled {
    /// Destination table → bucket, in first-seen order.
    pub tables: IndexMap<String, TableBucket>,

    /// Rows queued across all buckets.
    pub total_rows: usize,

    /// Records omitted under the skip policy.
    pub skipped: usize,

    pub assembled_at: DateTime<Utc>,
}

/// Groups events by destination and seeds one schema per destination.
pub struct Assembler {
    policies: Policies,
}

impl Assembler {
    pub fn new(policies: Policies) -> Self {
        Self { policies }
    }

    /// Assemble a batch.
    ///
    /// Under [`BadRecordPolicy::Error`] the first unroutable or uninferable
    /// record aborts the batch with its position; under
    /// [`BadRecordPolicy::Skip`] such records are logged and omitted.
    pub fn assemble(
        &self,
        events: &[ChangeEvent],
    ) -> Result<Assembled, AssemblyError> {
        let mut tables: IndexMap<String, TableBucket> = IndexMap::new();
        let mut total_rows = 0usize;
        let mut skipped = 0usize;

        for (position, event) in events.iter().enumerate() {
            let classified = event
                .record
                .change_key()
                .and_then(|key| classify(&key));

            let table = match classified {
                Ok(table) => table,
                Err(source) => match self.policies.bad_records {
                    BadRecordPolicy::Error => {
                        return Err(AssemblyError::Classification {
                            position,
                            source,
                        });
                    }
                    BadRecordPolicy::Skip => {
                        warn!(
                            position,
                            event_id = %event.event_id,
                            error = %source,
                            "omitting unroutable record"
                        );
                        skipped += 1;
                        continue;
                    }
                },
            };

            let row = materialize(event);

            if !tables.contains_key(&table) {
                let schema = match infer_object(&row, &self.policies) {
                    Ok(schema) => schema,
                    Err(source) => match self.policies.bad_records {
                        BadRecordPolicy::Error => {
                            return Err(AssemblyError::Schema {
                                position,
                                table,
                                source,
                            });
                        }
                        BadRecordPolicy::Skip => {
                            warn!(
                                position,
                                table = %table,
                                event_id = %event.event_id,
                                error = %source,
                                "omitting record with uninferable schema"
                            );
                            skipped += 1;
                            continue;
                        }
                    },
                };

                let fingerprint = compute_fingerprint(&schema);
                debug!(
                    table = %table,
                    fingerprint = %fingerprint,
                    fields = schema.len(),
                    "seeded destination schema"
                );
                tables.insert(
                    table.clone(),
                    TableBucket {
                        schema,
                        fingerprint,
                        rows: Vec::new(),
                    },
                );
            }

            if let Some(bucket) = tables.get_mut(&table) {
                bucket.rows.push(AttributeValue::Map(row).to_json());
                total_rows += 1;
            }
        }

        Ok(Assembled {
            tables,
            total_rows,
            skipped,
            assembled_at: Utc::now(),
        })
    }
}

/// Materialize the row queued for the sink: the record's keys, event
/// metadata, and whichever images the view type declares present.
fn materialize(event: &ChangeEvent) -> AttributeMap {
    let record = &event.record;
    let mut row = AttributeMap::new();

    row.insert(
        "Keys".to_string(),
        AttributeValue::Map(record.keys.clone()),
    );

    let mut metadata = AttributeMap::new();
    metadata.insert(
        "eventKind".to_string(),
        AttributeValue::String(event.kind.as_str().to_string()),
    );
    metadata.insert(
        "timestamp".to_string(),
        AttributeValue::Number(format_timestamp(
            record.approximate_creation_date_time,
        )),
    );
    row.insert("Metadata".to_string(), AttributeValue::Map(metadata));

    if let Some(image) = record.new_image() {
        row.insert("NewImage".to_string(), AttributeValue::Map(image.clone()));
    }
    if let Some(image) = record.old_image() {
        row.insert("OldImage".to_string(), AttributeValue::Map(image.clone()));
    }

    row
}

/// Whole-second timestamps render without a fractional part so they infer
/// as integer columns.
fn format_timestamp(seconds: f64) -> String {
    if seconds.fract() == 0.0 && seconds.abs() < i64::MAX as f64 {
        format!("{}", seconds as i64)
    } else {
        seconds.to_string()
    }
}

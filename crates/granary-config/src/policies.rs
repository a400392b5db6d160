//! Routing and inference policy knobs.
//!
//! Observed deployments of this pipeline disagree on how to treat records
//! that fail routing or inference, how to type nulls and numbers, and what an
//! empty array should infer to. Each of those choices is an explicit policy
//! here rather than a hard-coded behavior, with defaults matching the
//! primary deployment: fail fast on bad records, reject nulls, split
//! integer/float, placeholder for empty arrays.

use serde::{Deserialize, Serialize};

/// What to do with a record that fails classification or inference.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BadRecordPolicy {
    /// Abort the whole batch with the record's position.
    #[default]
    Error,

    /// Log a diagnostic with the record's keys and omit it from the batch.
    Skip,
}

/// How a null leaf value maps into the columnar model.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Nulls are unrepresentable; inference fails.
    #[default]
    Reject,

    /// Nulls become nullable string columns.
    NullableString,
}

/// How decimal values map onto column types.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NumberPolicy {
    /// Integral values become INTEGER, everything else FLOAT.
    #[default]
    Split,

    /// Every number becomes NUMERIC regardless of shape.
    Numeric,
}

/// What an empty array infers to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EmptyListPolicy {
    /// Emit a single repeated BOOLEAN placeholder field, so an empty list
    /// never yields an empty/ambiguous schema.
    #[default]
    Placeholder,

    /// Fail eagerly; empty arrays are untypeable.
    Reject,
}

/// The full policy set, one per open behavioral question.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(default)]
pub struct Policies {
    pub bad_records: BadRecordPolicy,
    pub nulls: NullPolicy,
    pub numbers: NumberPolicy,
    pub empty_lists: EmptyListPolicy,
}

impl Policies {
    /// Policy set that skips bad records instead of aborting.
    pub fn lenient() -> Self {
        Self {
            bad_records: BadRecordPolicy::Skip,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_fast() {
        let p = Policies::default();
        assert_eq!(p.bad_records, BadRecordPolicy::Error);
        assert_eq!(p.nulls, NullPolicy::Reject);
        assert_eq!(p.numbers, NumberPolicy::Split);
        assert_eq!(p.empty_lists, EmptyListPolicy::Placeholder);
    }

    #[test]
    fn wire_names_are_snake_case() {
        assert_eq!(
            serde_json::to_string(&NullPolicy::NullableString).unwrap(),
            r#""nullable_string""#
        );
        assert_eq!(
            serde_json::to_string(&BadRecordPolicy::Skip).unwrap(),
            r#""skip""#
        );
    }
}

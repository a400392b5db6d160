//! Record classification: composite change key → destination table name.
//!
//! The partition key encodes an entity family in its first `#`-delimited
//! segment; the sort key encodes a record category in its first segment, an
//! optional type discriminator in its second, and a lifecycle suffix in its
//! last. Routing matches the tuple `(pk_prefix, sk_prefix[, sk_suffix])`
//! against a fixed ordered rule table with plain tuple equality — order only
//! matters for rules sharing a prefix pair, and the table contains no ties.
//!
//! Classification is pure and deterministic: it depends only on the two key
//! strings, performs no I/O, and never logs. Callers decide what an
//! unmatched record means (abort vs. skip) under their configured policy.

use granary_core::{ChangeKey, ClassificationError, KEY_SEGMENT_DELIMITER};

/// Where a matched rule routes its records.
#[derive(Debug, Clone, Copy)]
enum Destination {
    /// A fixed table name.
    Fixed(&'static str),

    /// An assessment table family: `assessment_{sk_type}_{plural}`.
    /// Requires the sort key to carry a type discriminator segment.
    Assessment { plural: &'static str },
}

struct RouteRule {
    pk_prefix: &'static str,
    sk_prefix: &'static str,
    /// When set, the rule only matches records whose sort key ends with
    /// this segment.
    sk_suffix: Option<&'static str>,
    destination: Destination,
}

/// The routing table. Overlapping prefix pairs (the assessment family) are
/// disambiguated by suffix; everything else matches on the prefix pair alone.
const RULES: &[RouteRule] = &[
    RouteRule {
        pk_prefix: "patient",
        sk_prefix: "appointment",
        sk_suffix: None,
        destination: Destination::Fixed("appointments"),
    },
    RouteRule {
        pk_prefix: "patient",
        sk_prefix: "assessment",
        sk_suffix: Some("definition"),
        destination: Destination::Assessment {
            plural: "definitions",
        },
    },
    RouteRule {
        pk_prefix: "patient",
        sk_prefix: "assessment",
        sk_suffix: Some("inFlight"),
        destination: Destination::Assessment { plural: "inflights" },
    },
    RouteRule {
        pk_prefix: "patient",
        sk_prefix: "assessment",
        sk_suffix: Some("result"),
        destination: Destination::Assessment { plural: "results" },
    },
    RouteRule {
        pk_prefix: "patient",
        sk_prefix: "journey",
        sk_suffix: None,
        destination: Destination::Fixed("journeys"),
    },
    RouteRule {
        pk_prefix: "userProfile",
        sk_prefix: "patientGoalsDef",
        sk_suffix: None,
        destination: Destination::Fixed("patientgoalsdefs"),
    },
    RouteRule {
        pk_prefix: "userProfile",
        sk_prefix: "patient",
        sk_suffix: None,
        destination: Destination::Fixed("patients"),
    },
    RouteRule {
        pk_prefix: "userProfile",
        sk_prefix: "userProfile",
        sk_suffix: None,
        destination: Destination::Fixed("userprofiles"),
    },
];

/// Map a composite change key to its destination table name.
///
/// Destination names are lower-case `_`-delimited identifiers; the type
/// discriminator of assessment tables is lowercased on the way in so the
/// emitted name is always a valid identifier for the columnar store.
pub fn classify(key: &ChangeKey) -> Result<String, ClassificationError> {
    let pk_prefix = key
        .partition_key
        .split(KEY_SEGMENT_DELIMITER)
        .next()
        .unwrap_or_default();

    let sk_segments: Vec<&str> =
        key.sort_key.split(KEY_SEGMENT_DELIMITER).collect();
    let sk_prefix = sk_segments.first().copied().unwrap_or_default();
    let sk_type = sk_segments.get(1).copied();
    let sk_suffix = sk_segments.last().copied().unwrap_or_default();

    for rule in RULES {
        if rule.pk_prefix != pk_prefix || rule.sk_prefix != sk_prefix {
            continue;
        }
        if let Some(required) = rule.sk_suffix {
            if required != sk_suffix {
                continue;
            }
        }
        match rule.destination {
            Destination::Fixed(name) => return Ok(name.to_string()),
            Destination::Assessment { plural } => {
                // A templated rule without a type discriminator cannot
                // produce a table name; fall through to unmatched.
                if let Some(ty) = sk_type {
                    return Ok(format!(
                        "assessment_{}_{plural}",
                        ty.to_ascii_lowercase()
                    ));
                }
            }
        }
    }

    Err(ClassificationError::Unmatched {
        pk: key.partition_key.clone(),
        sk: key.sort_key.clone(),
    })
}

//! Schema fingerprint generation.
//!
//! Generates stable SHA-256 fingerprints from inferred schema forests for
//! diagnostics and bucket tagging. The fingerprint considers only the
//! structure — names, types, modes, children — so two batches whose first
//! records share a shape produce the same fingerprint.

use granary_core::FieldSchema;
use sha2::{Digest, Sha256};

/// Compute a stable fingerprint for a schema forest.
///
/// Hex-encoded SHA-256, truncated to the first 8 bytes (16 hex chars):
/// stable for a given structure, distinct across structures, short enough
/// for log lines.
pub fn compute_fingerprint(fields: &[FieldSchema]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hash_field(field, &mut hasher);
    }
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

fn hash_field(field: &FieldSchema, hasher: &mut Sha256) {
    hasher.update(field.name.as_bytes());
    hasher.update(b":");
    hasher.update(field.field_type.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(field.mode.as_str().as_bytes());
    hasher.update(b"{");
    for child in &field.fields {
        hash_field(child, hasher);
        hasher.update(b",");
    }
    hasher.update(b"}");
}

//! The inference engine.
//!
//! Type mapping for leaves, recursive descent for maps and lists, type
//! unification for array elements, and first-wins case-insensitive
//! deduplication for record fields. Field order within a record follows
//! first-seen insertion order; the result depends only on the shape and
//! types of the input.

use std::collections::HashSet;

use granary_config::{EmptyListPolicy, NullPolicy, NumberPolicy, Policies};
use granary_core::{
    AttributeMap, AttributeValue, FieldMode, FieldSchema, FieldType,
    SchemaError,
};

/// Synthetic name used while inferring array elements; the final field
/// keeps the real name, elements only contribute their types.
const ELEMENT_PLACEHOLDER: &str = "_element";

/// Derive the field list of a top-level record.
///
/// Child names are validated unique case-insensitively: the first
/// occurrence is kept, later duplicates are discarded without error.
pub fn infer_object(
    map: &AttributeMap,
    policies: &Policies,
) -> Result<Vec<FieldSchema>, SchemaError> {
    let mut fields = Vec::with_capacity(map.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(map.len());

    for (name, value) in map {
        if !seen.insert(name.to_ascii_lowercase()) {
            continue;
        }
        fields.push(infer_field(name, value, policies)?);
    }

    Ok(fields)
}

/// Derive the schema of a single named value.
pub fn infer_field(
    name: &str,
    value: &AttributeValue,
    policies: &Policies,
) -> Result<FieldSchema, SchemaError> {
    match value {
        AttributeValue::Boolean(_) => {
            Ok(FieldSchema::scalar(name, FieldType::Boolean))
        }

        AttributeValue::String(_) => {
            Ok(FieldSchema::scalar(name, FieldType::String))
        }

        AttributeValue::Binary(_) => {
            Ok(FieldSchema::scalar(name, FieldType::Bytes))
        }

        AttributeValue::Number(n) => Ok(FieldSchema::scalar(
            name,
            number_type(name, n, policies.numbers)?,
        )),

        AttributeValue::Null(_) => match policies.nulls {
            NullPolicy::Reject => Err(SchemaError::NullValue {
                field: name.to_string(),
            }),
            NullPolicy::NullableString => {
                Ok(FieldSchema::scalar(name, FieldType::String))
            }
        },

        AttributeValue::Map(entries) => {
            Ok(FieldSchema::record(name, infer_object(entries, policies)?))
        }

        AttributeValue::StringSet(_) => Ok(FieldSchema::scalar(
            name,
            FieldType::String,
        )
        .with_mode(FieldMode::Repeated)),

        AttributeValue::BinarySet(_) => Ok(FieldSchema::scalar(
            name,
            FieldType::Bytes,
        )
        .with_mode(FieldMode::Repeated)),

        AttributeValue::NumberSet(items) => {
            infer_number_set(name, items, policies)
        }

        AttributeValue::List(items) => infer_list(name, items, policies),
    }
}

/// Number typing: integral/fractional split, or always NUMERIC.
fn number_type(
    name: &str,
    decimal: &str,
    policy: NumberPolicy,
) -> Result<FieldType, SchemaError> {
    match policy {
        NumberPolicy::Numeric => Ok(FieldType::Numeric),
        NumberPolicy::Split => {
            if decimal.parse::<i64>().is_ok() {
                Ok(FieldType::Integer)
            } else if decimal.parse::<f64>().is_ok() {
                Ok(FieldType::Float)
            } else {
                Err(SchemaError::UnsupportedKind {
                    field: name.to_string(),
                    details: format!("`{decimal}` is not a decimal number")
                        .into(),
                })
            }
        }
    }
}

/// Number sets unify their element types exactly like list elements do.
fn infer_number_set(
    name: &str,
    items: &[String],
    policies: &Policies,
) -> Result<FieldSchema, SchemaError> {
    if items.is_empty() {
        return infer_empty_list(name, policies.empty_lists);
    }

    let mut unified: Option<FieldType> = None;
    for item in items {
        let ty = number_type(name, item, policies.numbers)?;
        match unified {
            None => unified = Some(ty),
            Some(prev) if prev != ty => {
                return Err(heterogeneous(name, &[prev, ty]));
            }
            Some(_) => {}
        }
    }

    // Loop above always sets `unified` for a non-empty set.
    let ty = unified.unwrap_or(FieldType::Numeric);
    Ok(FieldSchema::scalar(name, ty).with_mode(FieldMode::Repeated))
}

/// Lists unify to a single element type, merging child fields when the
/// unified type is a record.
fn infer_list(
    name: &str,
    items: &[AttributeValue],
    policies: &Policies,
) -> Result<FieldSchema, SchemaError> {
    if items.is_empty() {
        return infer_empty_list(name, policies.empty_lists);
    }

    let elements = items
        .iter()
        .map(|item| infer_field(ELEMENT_PLACEHOLDER, item, policies))
        .collect::<Result<Vec<_>, _>>()?;

    // A repeated element (nested list or set) has no representation in the
    // target columnar model: repeated-of-repeated is not a column shape.
    if let Some(nested) = elements.iter().find(|e| e.is_repeated()) {
        return Err(SchemaError::UnsupportedKind {
            field: name.to_string(),
            details: format!(
                "nested array of {} is not representable",
                nested.field_type.as_str()
            )
            .into(),
        });
    }

    let unified = elements[0].field_type;
    if elements.iter().any(|e| e.field_type != unified) {
        let mut found: Vec<FieldType> = Vec::new();
        for e in &elements {
            if !found.contains(&e.field_type) {
                found.push(e.field_type);
            }
        }
        return Err(heterogeneous(name, &found));
    }

    let fields = if unified == FieldType::Record {
        merge_element_fields(elements)
    } else {
        Vec::new()
    };

    Ok(FieldSchema {
        name: name.to_string(),
        field_type: unified,
        mode: FieldMode::Repeated,
        fields,
    })
}

fn infer_empty_list(
    name: &str,
    policy: EmptyListPolicy,
) -> Result<FieldSchema, SchemaError> {
    match policy {
        // An empty list never yields an empty/ambiguous schema: emit a
        // repeated boolean placeholder.
        EmptyListPolicy::Placeholder => Ok(FieldSchema::scalar(
            name,
            FieldType::Boolean,
        )
        .with_mode(FieldMode::Repeated)),
        EmptyListPolicy::Reject => Err(SchemaError::EmptyArray {
            field: name.to_string(),
        }),
    }
}

/// Merge the child-field lists of all record elements: union of names,
/// first occurrence wins, case-insensitive.
fn merge_element_fields(elements: Vec<FieldSchema>) -> Vec<FieldSchema> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for element in elements {
        for field in element.fields {
            if seen.insert(field.name.to_ascii_lowercase()) {
                merged.push(field);
            }
        }
    }

    merged
}

fn heterogeneous(name: &str, found: &[FieldType]) -> SchemaError {
    SchemaError::HeterogeneousArray {
        field: name.to_string(),
        found: found
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

use serde_json::Value;
use std::collections::HashSet;

use crate::client::Record;
use crate::store::{Document, ID_FIELD, REV_FIELD};

/// What a decode without a projection set returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unprojected {
    /// Only `_id` and `_rev` (point reads).
    MetadataOnly,
    /// Every field of the document (scans).
    FullDocument,
}

/// Build a new document for `key`. Values go out as text; byte sequences
/// that are not valid UTF-8 are replaced lossily and do not round-trip.
pub fn encode(key: &str, record: &Record) -> Document {
    let mut doc = Document::new(key);
    overlay(&mut doc, record);
    doc
}

/// Replace the fields named in `record`, leaving every other field and the
/// metadata untouched. Record fields named `_id` or `_rev` are dropped.
pub fn overlay(doc: &mut Document, record: &Record) {
    for (field, value) in record {
        if is_metadata(field) {
            continue;
        }
        doc.fields
            .insert(field.clone(), Value::String(value_to_text(value)));
    }
}

pub fn decode(doc: &Document, fields: Option<&HashSet<String>>, unprojected: Unprojected) -> Record {
    let mut record = Record::new();

    match (fields, unprojected) {
        (Some(fields), _) => {
            for field in fields {
                if let Some(value) = doc.fields.get(field) {
                    record.insert(field.clone(), text_to_value(value));
                }
            }
        }
        (None, Unprojected::MetadataOnly) => {}
        (None, Unprojected::FullDocument) => {
            for (field, value) in &doc.fields {
                record.insert(field.clone(), text_to_value(value));
            }
        }
    }

    // Metadata goes in last so the store's identity always wins.
    record.insert(ID_FIELD.to_string(), doc.id.clone().into_bytes());
    match &doc.rev {
        Some(rev) => {
            record.insert(REV_FIELD.to_string(), rev.as_str().as_bytes().to_vec());
        }
        None => {
            record.remove(REV_FIELD);
        }
    }

    record
}

fn is_metadata(field: &str) -> bool {
    field == ID_FIELD || field == REV_FIELD
}

fn value_to_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

// Documents written by other tools may hold non-string values; those come
// back as their JSON text.
fn text_to_value(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

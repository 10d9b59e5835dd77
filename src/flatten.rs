//! Field flattening and value resolution.
//!
//! [`flatten`] turns an [`InputRecord`] into an ordered list of single-valued
//! fields: array values become one field per element sharing the key, in
//! array order, and all fields of one key stay contiguous in record order.
//! [`resolve`] then splits each flattened value into its payload and the
//! optional [`TransferOptions`] attached by a wrapper.

use std::fmt;

use crate::value::{FieldValue, InputRecord, Pipe, TransferOptions};

// ── Payload ──────────────────────────────────────────────────────────────────

/// A single field's content once arrays and wrappers are peeled away.
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
    Stream(Box<dyn Pipe>),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_)   => "text",
            Payload::Binary(_) => "binary",
            Payload::Stream(_) => "stream",
        }
    }

    /// Text form used by the urlencoded serializer.  Only text has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _                => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(s)   => f.debug_tuple("Text").field(s).finish(),
            Payload::Binary(b) => write!(f, "Binary({} bytes)", b.len()),
            Payload::Stream(p) => f
                .debug_struct("Stream")
                .field("path", &p.path())
                .field("readable", &p.readable())
                .finish(),
        }
    }
}

// ── Flattener ────────────────────────────────────────────────────────────────

/// A flattened value: never an array.
#[derive(Debug)]
pub enum FlatValue {
    Plain(Payload),
    Wrapped(Payload, TransferOptions),
}

#[derive(Debug)]
pub struct FlatField {
    pub name:  String,
    pub value: FlatValue,
}

/// Expand `record` into single-valued fields.
///
/// Nested arrays expand depth-first.  A wrapper around an array gives each
/// element a copy of its options; a wrapper around a wrapper keeps the outer
/// options.
pub fn flatten(record: InputRecord) -> Vec<FlatField> {
    let mut out = Vec::with_capacity(record.len());
    for (name, value) in record {
        unfold(&name, value, None, &mut out);
    }
    out
}

fn unfold(name: &str, value: FieldValue, options: Option<&TransferOptions>, out: &mut Vec<FlatField>) {
    let payload = match value {
        FieldValue::Scalar(s) => Payload::Text(s),
        FieldValue::Binary(b) => Payload::Binary(b),
        FieldValue::Stream(p) => Payload::Stream(p),
        FieldValue::Array(items) => {
            for item in items {
                unfold(name, item, options, out);
            }
            return;
        }
        FieldValue::Wrapped { value, options: inner } => {
            unfold(name, *value, Some(options.unwrap_or(&inner)), out);
            return;
        }
    };
    let value = match options {
        Some(opts) => FlatValue::Wrapped(payload, opts.clone()),
        None       => FlatValue::Plain(payload),
    };
    out.push(FlatField { name: name.to_string(), value });
}

// ── Value resolver ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ResolvedField {
    pub name:    String,
    pub value:   Payload,
    pub options: Option<TransferOptions>,
}

/// Separate a flattened field's payload from its transfer options.
pub fn resolve(field: FlatField) -> ResolvedField {
    let (value, options) = match field.value {
        FlatValue::Plain(p)         => (p, None),
        FlatValue::Wrapped(p, opts) => (p, Some(opts)),
    };
    ResolvedField { name: field.name, value, options }
}

//! High-level [`encode`] API, the primary embedding surface.
//!
//! ```
//! use form_auto::{encode, FormOptions, InputRecord};
//!
//! let record = InputRecord::new()
//!     .field("field1", vec!["value1", "value3"])
//!     .field("field2", "value2");
//! let out = encode(record, &FormOptions::default())?;
//! assert_eq!(out.headers["content-type"], "application/x-www-form-urlencoded");
//! assert_eq!(out.payload.into_bytes()?, b"field1=value1&field1=value3&field2=value2");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::body::Body;
use crate::detect::{is_byte_stream, select_encoding, Encoding, CONTENT_TYPE_URLENCODED};
use crate::flatten::{flatten, resolve, Payload, ResolvedField};
use crate::multipart::FormData;
use crate::urlencoded;
use crate::value::json::{kind_of, record_from_json};
use crate::value::InputRecord;

pub const DEFAULT_PAYLOAD_KEY: &str = "payload";
pub const DEFAULT_HEADERS_KEY: &str = "headers";

/// Lower-case header name → value, in insertion order.
pub type Headers = IndexMap<String, String>;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Input to form encoding must be a record of fields, got {0}")]
    InvalidInput(&'static str),
    #[error("Unknown form option `{0}` (expected payload, headers or forceMultiPart)")]
    UnknownOption(String),
    #[error("Payload and headers cannot share the output key `{0}`")]
    DuplicateOutputKey(String),
    #[error("Invalid form options: {0}")]
    InvalidOptions(#[source] serde_json::Error),
    #[error("Invalid transfer options for field `{field}`: {source}")]
    TransferOptions {
        field:  String,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── FormOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormOptions {
    /// Output key holding the body.
    pub payload:         String,
    /// Output key holding the header map.
    pub headers:         String,
    /// Use multipart even when no field is file-like.
    #[serde(rename = "forceMultiPart")]
    pub force_multipart: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            payload:         DEFAULT_PAYLOAD_KEY.to_string(),
            headers:         DEFAULT_HEADERS_KEY.to_string(),
            force_multipart: false,
        }
    }
}

impl FormOptions {
    pub fn payload_key(mut self, key: impl Into<String>) -> Self {
        self.payload = key.into();
        self
    }

    pub fn headers_key(mut self, key: impl Into<String>) -> Self {
        self.headers = key.into();
        self
    }

    pub fn force_multipart(mut self, force: bool) -> Self {
        self.force_multipart = force;
        self
    }

    /// Parse an untyped options object.  Keys outside
    /// `{payload, headers, forceMultiPart}` are rejected.
    pub fn from_json(json: Value) -> Result<Self, FormError> {
        let members = match json {
            Value::Object(members) => members,
            Value::Null            => return Ok(Self::default()),
            other                  => return Err(FormError::InvalidInput(kind_of(&other))),
        };
        if let Some(unknown) = members
            .keys()
            .find(|k| !matches!(k.as_str(), "payload" | "headers" | "forceMultiPart"))
        {
            return Err(FormError::UnknownOption(unknown.clone()));
        }
        let opts: Self = serde_json::from_value(Value::Object(members)).map_err(FormError::InvalidOptions)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.payload == self.headers {
            return Err(FormError::DuplicateOutputKey(self.payload.clone()));
        }
        Ok(())
    }
}

// ── FormOutput ───────────────────────────────────────────────────────────────

/// Encoded body and the headers describing it.
#[derive(Debug)]
pub struct FormOutput {
    pub payload:  Body,
    pub headers:  Headers,
    pub encoding: Encoding,
}

impl FormOutput {
    /// Present the two slots under the configured key names.
    ///
    /// Fails with [`FormError::DuplicateOutputKey`] when both slots would
    /// land on the same key.
    pub fn into_named(self, options: &FormOptions) -> Result<NamedOutput, FormError> {
        options.validate()?;
        let mut entries = IndexMap::with_capacity(2);
        entries.insert(options.payload.clone(), OutputSlot::Payload(self.payload));
        entries.insert(options.headers.clone(), OutputSlot::Headers(self.headers));
        Ok(NamedOutput { entries })
    }
}

#[derive(Debug)]
pub enum OutputSlot {
    Payload(Body),
    Headers(Headers),
}

/// The output keyed by caller-chosen names.  Holds exactly the two
/// configured keys.
#[derive(Debug)]
pub struct NamedOutput {
    entries: IndexMap<String, OutputSlot>,
}

impl NamedOutput {
    pub fn get(&self, key: &str) -> Option<&OutputSlot> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn headers(&self, key: &str) -> Option<&Headers> {
        match self.entries.get(key) {
            Some(OutputSlot::Headers(h)) => Some(h),
            _                            => None,
        }
    }

    /// Take the body out of the `key` slot.
    pub fn take_payload(&mut self, key: &str) -> Option<Body> {
        if !matches!(self.entries.get(key), Some(OutputSlot::Payload(_))) {
            return None;
        }
        match self.entries.shift_remove(key) {
            Some(OutputSlot::Payload(body)) => Some(body),
            _                               => None,
        }
    }

    pub fn into_entries(self) -> IndexMap<String, OutputSlot> {
        self.entries
    }
}

// ── encode ───────────────────────────────────────────────────────────────────

/// Encode `record` as a request body, choosing the encoding from its shape.
///
/// Any readable stream or byte buffer anywhere in the record makes the whole
/// body multipart; otherwise it is urlencoded unless `force_multipart` is set.
/// Streams are not read here; they are read when the payload is.
pub fn encode(record: InputRecord, options: &FormOptions) -> Result<FormOutput, FormError> {
    let fields: Vec<ResolvedField> = flatten(record).into_iter().map(resolve).collect();
    for field in &fields {
        log::trace!("field {:?}: {}", field.name, field.value.kind());
        if let Payload::Stream(p) = &field.value {
            if !is_byte_stream(p.as_ref()) {
                log::warn!("field {:?} is a stream marked not readable; it does not count as a file", field.name);
            }
        }
    }

    let encoding = select_encoding(fields.iter().map(|f| &f.value), options.force_multipart);
    log::debug!("encoding {} field(s) as {}", fields.len(), encoding.name());

    Ok(match encoding {
        Encoding::Multipart  => build_multipart(fields),
        Encoding::UrlEncoded => build_urlencoded(fields),
    })
}

/// [`encode`] for untyped JSON input.  Non-object input fails with
/// [`FormError::InvalidInput`].
pub fn encode_json(json: Value, options: &FormOptions) -> Result<FormOutput, FormError> {
    let record = record_from_json(json)?;
    encode(record, options)
}

fn build_multipart(fields: Vec<ResolvedField>) -> FormOutput {
    let mut form = FormData::new();
    for field in fields {
        form.append(&field.name, field.value, field.options.as_ref());
    }
    let mut headers = Headers::new();
    headers.insert("content-type".to_string(), String::new());
    headers.extend(form.headers());
    FormOutput {
        payload:  form.into_body(),
        headers,
        encoding: Encoding::Multipart,
    }
}

fn build_urlencoded(fields: Vec<ResolvedField>) -> FormOutput {
    let body = urlencoded::serialize(&fields);
    let mut headers = Headers::new();
    headers.insert("content-type".to_string(), CONTENT_TYPE_URLENCODED.to_string());
    FormOutput {
        payload:  Body::from_bytes(body),
        headers,
        encoding: Encoding::UrlEncoded,
    }
}

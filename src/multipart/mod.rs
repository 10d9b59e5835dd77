//! `multipart/form-data` writer.
//!
//! # Framing
//! Each part is written as
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{name}"[; filename="{filename}"]\r\n
//! [Content-Type: {type}\r\n]
//! \r\n
//! {value}\r\n
//! ```
//!
//! and the body ends with `--{boundary}--\r\n`.
//!
//! # Defaults
//! Filename: `options.filename`, else the file name of the stream's path.
//! Content type: `options.content_type`, else guessed from the filename, else
//! `application/octet-stream` for binary and stream values.  Text fields carry
//! no content type.
//!
//! # Length
//! Text and binary lengths are known.  A stream's length comes from
//! `options.known_length` or the stream's own hint.  `content-length` is only
//! emitted when every part's length is known.

use std::io::{Cursor, Read};

use uuid::Uuid;

use crate::body::Body;
use crate::flatten::Payload;
use crate::form::Headers;
use crate::value::TransferOptions;

const CRLF: &str = "\r\n";
const DEFAULT_BINARY_TYPE: &str = "application/octet-stream";

pub struct FormData {
    boundary: String,
    parts:    Vec<Part>,
}

struct Part {
    head:   Vec<u8>,
    body:   Payload,
    length: Option<u64>,
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}

impl FormData {
    /// A form with a fresh random boundary.
    pub fn new() -> Self {
        Self::with_boundary(gen_boundary())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self { boundary: boundary.into(), parts: Vec::new() }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append one field.  Parts are written in append order.
    pub fn append(&mut self, name: &str, value: Payload, options: Option<&TransferOptions>) {
        let filename     = part_filename(&value, options);
        let content_type = part_content_type(&value, options, filename.as_deref());
        let head         = self.part_head(name, filename.as_deref(), content_type.as_deref());
        let length = match &value {
            Payload::Text(s)   => Some(s.len() as u64),
            Payload::Binary(b) => Some(b.len() as u64),
            Payload::Stream(p) => options.and_then(|o| o.known_length).or_else(|| p.len_hint()),
        };
        log::trace!(
            "multipart part name={name:?} kind={} filename={filename:?} length={length:?}",
            value.kind()
        );
        self.parts.push(Part { head, body: value, length });
    }

    /// `multipart/form-data; boundary=...`
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Full body length in bytes, if every part's length is known and the
    /// total fits in a `u64`.
    pub fn known_length(&self) -> Option<u64> {
        let mut total = self.footer().len() as u64;
        for part in &self.parts {
            total = total
                .checked_add(part.head.len() as u64)?
                .checked_add(part.length?)?
                .checked_add(CRLF.len() as u64)?;
        }
        Some(total)
    }

    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), self.content_type());
        if let Some(len) = self.known_length() {
            headers.insert("content-length".to_string(), len.to_string());
        }
        headers
    }

    /// Consume the form into a body that reads the parts in order.  Streams
    /// are pulled lazily as the body is read.
    pub fn into_body(self) -> Body {
        let len    = self.known_length();
        let footer = self.footer();
        let mut readers: Vec<Box<dyn Read + Send>> = Vec::with_capacity(self.parts.len() * 3 + 1);
        for part in self.parts {
            readers.push(Box::new(Cursor::new(part.head)));
            match part.body {
                Payload::Text(s)   => readers.push(Box::new(Cursor::new(s.into_bytes()))),
                Payload::Binary(b) => readers.push(Box::new(Cursor::new(b))),
                Payload::Stream(p) => readers.push(Box::new(p)),
            }
            readers.push(Box::new(Cursor::new(CRLF.as_bytes())));
        }
        readers.push(Box::new(Cursor::new(footer.into_bytes())));
        Body::from_sequence(readers, len)
    }

    fn part_head(&self, name: &str, filename: Option<&str>, content_type: Option<&str>) -> Vec<u8> {
        let mut head = format!(
            "--{}{CRLF}Content-Disposition: form-data; name=\"{}\"",
            self.boundary,
            escape_quoted(name)
        );
        if let Some(filename) = filename {
            head.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
        }
        head.push_str(CRLF);
        if let Some(ct) = content_type {
            head.push_str(&format!("Content-Type: {ct}{CRLF}"));
        }
        head.push_str(CRLF);
        head.into_bytes()
    }

    fn footer(&self) -> String {
        format!("--{}--{CRLF}", self.boundary)
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// 26 dashes + 24 hex digits.
pub fn gen_boundary() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", "-".repeat(26), &hex[..24])
}

fn part_filename(value: &Payload, options: Option<&TransferOptions>) -> Option<String> {
    if let Some(name) = options.and_then(|o| o.filename.clone()) {
        return Some(name);
    }
    match value {
        Payload::Stream(p) => p
            .path()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned()),
        _ => None,
    }
}

fn part_content_type(value: &Payload, options: Option<&TransferOptions>, filename: Option<&str>) -> Option<String> {
    if let Some(ct) = options.and_then(|o| o.content_type.clone()) {
        return Some(ct);
    }
    if let Some(guess) = filename.and_then(|f| mime_guess::from_path(f).first()) {
        return Some(guess.to_string());
    }
    match value {
        Payload::Text(_) => None,
        _                => Some(DEFAULT_BINARY_TYPE.to_string()),
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

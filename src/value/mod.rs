//! Field values accepted by the encoder.
//!
//! An [`InputRecord`] maps field names to [`FieldValue`]s in insertion order.
//! A value is either a scalar, an in-memory byte buffer, a single-pass byte
//! stream, an array of values (repeated field), or a wrapped value carrying
//! [`TransferOptions`] for the multipart part it ends up in.
//!
//! # Streams
//! Anything implementing [`Pipe`] can be attached as a stream field.  The
//! encoder never reads a stream itself; ownership moves into the returned
//! payload and the bytes are pulled when the payload is read.

pub mod json;

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ── Pipe capability ──────────────────────────────────────────────────────────

/// A finite, single-pass producer of bytes that can be piped into a body.
///
/// Implementing this trait is what makes a value stream-like; there is no
/// nominal stream type.  Custom adapters are accepted as long as they are
/// readable.
pub trait Pipe: Read + Send {
    /// `Some(false)` marks a stream that has been closed for reading.
    /// `None` means "not stated", which counts as readable.
    fn readable(&self) -> Option<bool> {
        None
    }

    /// Filesystem path backing the stream, used for filename defaulting.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Remaining byte count, when known up front.
    fn len_hint(&self) -> Option<u64> {
        None
    }
}

/// An opened file that remembers where it came from.
pub struct FileStream {
    file: File,
    path: PathBuf,
    len:  Option<u64>,
}

impl FileStream {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len  = file.metadata().ok().map(|m| m.len());
        Ok(Self { file, path, len })
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Pipe for FileStream {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn len_hint(&self) -> Option<u64> {
        self.len
    }
}

/// Adapter turning any `Read + Send` into a [`Pipe`].
pub struct ReaderStream<R> {
    inner:    R,
    len:      Option<u64>,
    readable: Option<bool>,
}

impl<R: Read + Send> ReaderStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, len: None, readable: None }
    }

    /// Declare how many bytes the reader will produce.
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    /// Set the readable flag explicitly.
    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = Some(readable);
        self
    }
}

impl<R: Read + Send> Read for ReaderStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> Pipe for ReaderStream<R> {
    fn readable(&self) -> Option<bool> {
        self.readable
    }

    fn len_hint(&self) -> Option<u64> {
        self.len
    }
}

// ── TransferOptions ──────────────────────────────────────────────────────────

/// Per-field metadata for the multipart part: filename, content type and
/// length.  Keys the encoder does not know about are kept in `extra` and
/// passed along untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename:     Option<String>,
    #[serde(default, rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, rename = "knownLength", skip_serializing_if = "Option::is_none")]
    pub known_length: Option<u64>,
    #[serde(flatten)]
    pub extra:        IndexMap<String, serde_json::Value>,
}

impl TransferOptions {
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn known_length(mut self, len: u64) -> Self {
        self.known_length = Some(len);
        self
    }
}

// ── FieldValue ───────────────────────────────────────────────────────────────

pub enum FieldValue {
    Scalar(String),
    Binary(Vec<u8>),
    Stream(Box<dyn Pipe>),
    /// Repeated field: one output field per element, in order.
    Array(Vec<FieldValue>),
    /// A value with transfer options attached.  Wrapping never changes how
    /// the inner value is classified.
    Wrapped {
        value:   Box<FieldValue>,
        options: TransferOptions,
    },
}

impl FieldValue {
    pub fn stream<P: Pipe + 'static>(pipe: P) -> Self {
        FieldValue::Stream(Box::new(pipe))
    }

    /// Open `path` as a stream field.
    pub fn file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::stream(FileStream::open(path)?))
    }

    pub fn wrapped(value: impl Into<FieldValue>, options: TransferOptions) -> Self {
        FieldValue::Wrapped { value: Box::new(value.into()), options }
    }

    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        FieldValue::Array(items.into_iter().map(Into::into).collect())
    }

    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Scalar(_)      => "scalar",
            FieldValue::Binary(_)      => "binary",
            FieldValue::Stream(_)      => "stream",
            FieldValue::Array(_)       => "array",
            FieldValue::Wrapped { .. } => "wrapped",
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(s)  => f.debug_tuple("Scalar").field(s).finish(),
            FieldValue::Binary(b)  => write!(f, "Binary({} bytes)", b.len()),
            FieldValue::Stream(p)  => f
                .debug_struct("Stream")
                .field("path", &p.path())
                .field("readable", &p.readable())
                .finish(),
            FieldValue::Array(v)   => f.debug_tuple("Array").field(v).finish(),
            FieldValue::Wrapped { value, options } => f
                .debug_struct("Wrapped")
                .field("value", value)
                .field("options", options)
                .finish(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self { FieldValue::Scalar(s.to_string()) }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self { FieldValue::Scalar(s) }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self { FieldValue::Scalar(b.to_string()) }
}

macro_rules! scalar_from_display {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self { FieldValue::Scalar(v.to_string()) }
        })*
    };
}
scalar_from_display!(i32, i64, u32, u64, usize, f64);

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self { FieldValue::Binary(b) }
}

impl From<&[u8]> for FieldValue {
    fn from(b: &[u8]) -> Self { FieldValue::Binary(b.to_vec()) }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self { FieldValue::Array(v) }
}

impl From<Vec<&str>> for FieldValue {
    fn from(v: Vec<&str>) -> Self { FieldValue::array(v) }
}

// ── InputRecord ──────────────────────────────────────────────────────────────

/// Field name → value, in insertion order.  Inserting an existing name
/// replaces its value in place.
#[derive(Debug, Default)]
pub struct InputRecord {
    fields: IndexMap<String, FieldValue>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl IntoIterator for InputRecord {
    type Item     = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = InputRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn record_keeps_insertion_order() {
        let record = InputRecord::new()
            .field("zeta", "1")
            .field("alpha", "2")
            .field("mid", "3");
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut record = InputRecord::new().field("a", "1").field("b", "2");
        record.insert("a", "3");
        assert_eq!(record.len(), 2);
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(matches!(record.get("a"), Some(FieldValue::Scalar(s)) if s == "3"));
    }

    #[test]
    fn primitive_conversions() {
        assert!(matches!(FieldValue::from(true), FieldValue::Scalar(s) if s == "true"));
        assert!(matches!(FieldValue::from(42i64), FieldValue::Scalar(s) if s == "42"));
        assert!(matches!(FieldValue::from(vec![1u8, 2]), FieldValue::Binary(b) if b == [1, 2]));
        assert!(matches!(FieldValue::from(vec!["a", "b"]), FieldValue::Array(v) if v.len() == 2));
    }

    #[test]
    fn reader_stream_flags() {
        let s = ReaderStream::new(Cursor::new(b"abc".to_vec())).with_len(3);
        assert_eq!(s.len_hint(), Some(3));
        assert_eq!(s.readable(), None);
        let closed = ReaderStream::new(io::empty()).with_readable(false);
        assert_eq!(closed.readable(), Some(false));
    }

    #[test]
    fn file_stream_knows_path_and_size() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, b"hello").unwrap();
        let stream = FileStream::open(tmp.path()).unwrap();
        assert_eq!(stream.path(), Some(tmp.path()));
        assert_eq!(stream.len_hint(), Some(5));
    }

    #[test]
    fn transfer_options_json_keys() {
        let opts: TransferOptions = serde_json::from_value(serde_json::json!({
            "filename": "bar.md",
            "contentType": "text/markdown",
            "knownLength": 19806,
            "header": "x"
        }))
        .unwrap();
        assert_eq!(opts.filename.as_deref(), Some("bar.md"));
        assert_eq!(opts.content_type.as_deref(), Some("text/markdown"));
        assert_eq!(opts.known_length, Some(19806));
        assert_eq!(opts.extra.get("header"), Some(&serde_json::json!("x")));
    }
}

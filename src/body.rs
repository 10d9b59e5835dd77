//! The request body handed back to the caller.
//!
//! A [`Body`] is a single-pass byte stream regardless of encoding: urlencoded
//! bodies are a complete in-memory buffer, multipart bodies are a sequence of
//! framing buffers and field streams read one after another.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Cursor, Read};

use crate::value::Pipe;

/// Upper bound on the buffer reserved by [`Body::into_bytes`].
pub const MAX_PREALLOC: usize = 64 * 1024;

pub struct Body {
    inner: Box<dyn Read + Send>,
    len:   Option<u64>,
    read:  u64,
}

impl Body {
    /// A finished body over in-memory bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let len   = bytes.len() as u64;
        Self { inner: Box::new(Cursor::new(bytes)), len: Some(len), read: 0 }
    }

    /// Readers drained in order, as one stream.
    pub fn from_sequence(readers: Vec<Box<dyn Read + Send>>, len: Option<u64>) -> Self {
        Self {
            inner: Box::new(Sequence { readers: readers.into() }),
            len,
            read:  0,
        }
    }

    /// Total size in bytes, when every part's length is known.
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    /// `true` only when the length is known to be zero; `false` means
    /// non-empty or unknown.
    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    /// Read the remaining bytes into memory.  The declared length is only a
    /// hint; at most [`MAX_PREALLOC`] bytes are reserved up front.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let reserve = self.remaining().unwrap_or(0).min(MAX_PREALLOC as u64) as usize;
        let mut out = Vec::with_capacity(reserve);
        self.read_to_end(&mut out)?;
        Ok(out)
    }

    fn remaining(&self) -> Option<u64> {
        self.len.map(|l| l.saturating_sub(self.read))
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

/// A body can itself be attached as a stream field of another form.
impl Pipe for Body {
    fn len_hint(&self) -> Option<u64> {
        self.remaining()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("len", &self.len)
            .field("read", &self.read)
            .finish()
    }
}

// ── Sequence ─────────────────────────────────────────────────────────────────

/// Reads each inner reader to EOF before moving to the next.
struct Sequence {
    readers: VecDeque<Box<dyn Read + Send>>,
}

impl Read for Sequence {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while let Some(front) = self.readers.front_mut() {
            match front.read(buf)? {
                0 => { self.readers.pop_front(); }
                n => return Ok(n),
            }
        }
        Ok(0)
    }
}

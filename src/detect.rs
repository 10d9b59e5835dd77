//! File detection and the global encoding decision.

use crate::flatten::Payload;
use crate::value::Pipe;

pub const CONTENT_TYPE_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_MULTIPART:  &str = "multipart/form-data";

/// Structural stream check: anything implementing [`Pipe`] qualifies unless it
/// reports itself as not readable.  Half-consumed streams still qualify.
#[inline]
pub fn is_byte_stream(pipe: &dyn Pipe) -> bool {
    pipe.readable() != Some(false)
}

/// A payload is file-like when it is a readable stream or a byte buffer.
pub fn is_file_like(payload: &Payload) -> bool {
    match payload {
        Payload::Text(_)   => false,
        Payload::Binary(_) => true,
        Payload::Stream(p) => is_byte_stream(p.as_ref()),
    }
}

/// Body encoding for a whole form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    UrlEncoded,
    Multipart,
}

impl Encoding {
    pub fn is_multipart(self) -> bool {
        self == Encoding::Multipart
    }

    /// Bare media type (multipart bodies add a boundary parameter).
    pub fn media_type(self) -> &'static str {
        match self {
            Encoding::UrlEncoded => CONTENT_TYPE_URLENCODED,
            Encoding::Multipart  => CONTENT_TYPE_MULTIPART,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::UrlEncoded => "urlencoded",
            Encoding::Multipart  => "multipart",
        }
    }
}

/// OR together the file-like flags of every field; `force_multipart`
/// short-circuits to multipart.
pub fn select_encoding<'a, I>(payloads: I, force_multipart: bool) -> Encoding
where
    I: IntoIterator<Item = &'a Payload>,
{
    if force_multipart || payloads.into_iter().any(is_file_like) {
        Encoding::Multipart
    } else {
        Encoding::UrlEncoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ReaderStream;
    use std::io::{self, Cursor, Read};

    fn stream(readable: Option<bool>) -> Payload {
        let s = ReaderStream::new(Cursor::new(b"data".to_vec()));
        let s = match readable {
            Some(r) => s.with_readable(r),
            None    => s,
        };
        Payload::Stream(Box::new(s))
    }

    /// Not a real stream at all, just something that claims the capability.
    struct Forged;
    impl Read for Forged {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> { Ok(0) }
    }
    impl Pipe for Forged {}

    #[test]
    fn classification() {
        assert!(!is_file_like(&Payload::Text("x".into())));
        assert!(is_file_like(&Payload::Binary(Vec::new())));
        assert!(is_file_like(&stream(None)));
        assert!(is_file_like(&stream(Some(true))));
        assert!(!is_file_like(&stream(Some(false))));
    }

    #[test]
    fn forged_pipe_counts_as_stream() {
        assert!(is_file_like(&Payload::Stream(Box::new(Forged))));
    }

    #[test]
    fn half_consumed_stream_is_still_file_like() {
        let mut s = ReaderStream::new(Cursor::new(b"abcdef".to_vec()));
        let mut buf = [0u8; 3];
        s.read_exact(&mut buf).unwrap();
        assert!(is_file_like(&Payload::Stream(Box::new(s))));
    }

    #[test]
    fn one_file_makes_whole_form_multipart() {
        let fields = vec![Payload::Text("a".into()), Payload::Binary(vec![0]), Payload::Text("b".into())];
        assert_eq!(select_encoding(&fields, false), Encoding::Multipart);
    }

    #[test]
    fn text_only_is_urlencoded_unless_forced() {
        let fields = vec![Payload::Text("a".into()), stream(Some(false))];
        assert_eq!(select_encoding(&fields, false), Encoding::UrlEncoded);
        assert_eq!(select_encoding(&fields, true), Encoding::Multipart);
        assert_eq!(select_encoding(std::iter::empty(), false), Encoding::UrlEncoded);
    }

    #[test]
    fn media_types() {
        assert_eq!(Encoding::UrlEncoded.media_type(), "application/x-www-form-urlencoded");
        assert_eq!(Encoding::Multipart.media_type(), "multipart/form-data");
        assert!(Encoding::Multipart.is_multipart());
    }
}

//! `application/x-www-form-urlencoded` serialization.
//!
//! Pairs are joined as `key=value` with `&`, escaped by `form_urlencoded`
//! (spaces become `+`).  Only text has a string form; any other payload
//! that reaches this path is written as an empty value.

use crate::flatten::ResolvedField;

/// Serialize fields in order.  Transfer options are ignored.
pub fn serialize<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a ResolvedField>,
{
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for field in fields {
        ser.append_pair(&field.name, field.value.as_text().unwrap_or(""));
    }
    ser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::Payload;
    use crate::value::{ReaderStream, TransferOptions};
    use std::io;

    fn text(name: &str, value: &str) -> ResolvedField {
        ResolvedField { name: name.into(), value: Payload::Text(value.into()), options: None }
    }

    #[test]
    fn pairs_join_in_order() {
        let fields = vec![text("field1", "value1"), text("field1", "value3"), text("field2", "value2")];
        assert_eq!(serialize(&fields), "field1=value1&field1=value3&field2=value2");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let fields = vec![text("a b", "x&y=z"), text("emoji", "👌")];
        assert_eq!(serialize(&fields), "a+b=x%26y%3Dz&emoji=%F0%9F%91%8C");
    }

    #[test]
    fn options_and_non_text_values() {
        let fields = vec![
            ResolvedField {
                name:    "wrapped".into(),
                value:   Payload::Text("v".into()),
                options: Some(TransferOptions::default().filename("ignored.txt")),
            },
            ResolvedField {
                name:    "closed".into(),
                value:   Payload::Stream(Box::new(ReaderStream::new(io::empty()).with_readable(false))),
                options: None,
            },
        ];
        assert_eq!(serialize(&fields), "wrapped=v&closed=");
    }

    #[test]
    fn empty_form_is_empty_string() {
        assert_eq!(serialize(&Vec::new()), "");
    }
}

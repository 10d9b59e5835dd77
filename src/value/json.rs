//! Building an [`InputRecord`] from untyped JSON.
//!
//! Member conversion:
//!   - string / number / bool → `Scalar` (numbers and bools as their JSON text)
//!   - `null`                 → empty `Scalar`
//!   - array                  → `Array`
//!   - object with a `value` member → `Wrapped`, `options` parsed as
//!     [`TransferOptions`] (absent → defaults)
//!   - any other object       → empty `Scalar`
//!
//! With a file base directory, strings starting with `@` name files to attach
//! as streams (`@@` escapes a literal `@`).

use std::path::Path;

use serde_json::{Map, Value};

use super::{FieldValue, FileStream, InputRecord, TransferOptions};
use crate::form::FormError;

/// Convert a JSON object into an [`InputRecord`].
///
/// Fails with [`FormError::InvalidInput`] for anything that is not an object.
pub fn record_from_json(json: Value) -> Result<InputRecord, FormError> {
    Loader { base_dir: None }.record(json)
}

/// Like [`record_from_json`], resolving `@path` strings relative to `base_dir`.
pub fn record_from_json_with_files(json: Value, base_dir: &Path) -> Result<InputRecord, FormError> {
    Loader { base_dir: Some(base_dir) }.record(json)
}

/// JSON type name for error messages.
pub fn kind_of(json: &Value) -> &'static str {
    match json {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

struct Loader<'a> {
    base_dir: Option<&'a Path>,
}

impl Loader<'_> {
    fn record(&self, json: Value) -> Result<InputRecord, FormError> {
        let members = match json {
            Value::Object(members) => members,
            other => return Err(FormError::InvalidInput(kind_of(&other))),
        };
        let mut record = InputRecord::new();
        for (name, member) in members {
            let value = self.value(&name, member)?;
            record.insert(name, value);
        }
        Ok(record)
    }

    fn value(&self, field: &str, json: Value) -> Result<FieldValue, FormError> {
        Ok(match json {
            Value::Null      => FieldValue::Scalar(String::new()),
            Value::Bool(b)   => FieldValue::Scalar(b.to_string()),
            Value::Number(n) => FieldValue::Scalar(n.to_string()),
            Value::String(s) => self.string(s)?,
            Value::Array(items) => FieldValue::Array(
                items
                    .into_iter()
                    .map(|item| self.value(field, item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(mut members) => {
                if !members.contains_key("value") {
                    return Ok(FieldValue::Scalar(String::new()));
                }
                let inner   = members.remove("value").unwrap_or(Value::Null);
                let options = self.options(field, &mut members)?;
                FieldValue::Wrapped {
                    value: Box::new(self.value(field, inner)?),
                    options,
                }
            }
        })
    }

    fn options(&self, field: &str, members: &mut Map<String, Value>) -> Result<TransferOptions, FormError> {
        match members.remove("options") {
            None | Some(Value::Null) => Ok(TransferOptions::default()),
            Some(raw) => serde_json::from_value(raw).map_err(|source| FormError::TransferOptions {
                field: field.to_string(),
                source,
            }),
        }
    }

    fn string(&self, s: String) -> Result<FieldValue, FormError> {
        let base = match self.base_dir {
            Some(base) => base,
            None       => return Ok(FieldValue::Scalar(s)),
        };
        if let Some(literal) = s.strip_prefix("@@") {
            return Ok(FieldValue::Scalar(format!("@{literal}")));
        }
        match s.strip_prefix('@') {
            Some(rel) if !rel.is_empty() => {
                log::debug!("attaching file {}", base.join(rel).display());
                Ok(FieldValue::stream(FileStream::open(base.join(rel))?))
            }
            _ => Ok(FieldValue::Scalar(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_objects_are_rejected() {
        for input in [Value::Null, json!("string"), json!(true), json!(12), json!(["a"])] {
            let err = record_from_json(input).unwrap_err();
            assert!(matches!(err, FormError::InvalidInput(_)), "{err}");
        }
    }

    #[test]
    fn members_convert_in_order() {
        let record = record_from_json(json!({
            "b": "text",
            "a": 1.5,
            "c": [true, null],
            "d": {"nested": 1}
        }))
        .unwrap();
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["b", "a", "c", "d"]);
        assert!(matches!(record.get("a"), Some(FieldValue::Scalar(s)) if s == "1.5"));
        match record.get("c") {
            Some(FieldValue::Array(items)) => {
                assert!(matches!(&items[0], FieldValue::Scalar(s) if s == "true"));
                assert!(matches!(&items[1], FieldValue::Scalar(s) if s.is_empty()));
            }
            other => panic!("expected array, got {other:?}"),
        }
        assert!(matches!(record.get("d"), Some(FieldValue::Scalar(s)) if s.is_empty()));
    }

    #[test]
    fn objects_without_value_encode_empty() {
        let out = crate::encode_json(json!({"a": {"nested": 1}, "b": "x"}), &crate::FormOptions::default()).unwrap();
        assert_eq!(out.payload.into_bytes().unwrap(), b"a=&b=x");
    }

    #[test]
    fn value_member_presence_makes_wrapped() {
        let record = record_from_json(json!({
            "plain": {"value": null},
            "withOpts": {"value": "x", "options": {"filename": "a.txt"}}
        }))
        .unwrap();
        match record.get("plain") {
            Some(FieldValue::Wrapped { value, options }) => {
                assert!(matches!(value.as_ref(), FieldValue::Scalar(s) if s.is_empty()));
                assert_eq!(options, &TransferOptions::default());
            }
            other => panic!("expected wrapped, got {other:?}"),
        }
        match record.get("withOpts") {
            Some(FieldValue::Wrapped { options, .. }) => {
                assert_eq!(options.filename.as_deref(), Some("a.txt"));
            }
            other => panic!("expected wrapped, got {other:?}"),
        }
    }

    #[test]
    fn bad_options_name_the_field() {
        let err = record_from_json(json!({"f": {"value": "x", "options": {"filename": 3}}})).unwrap_err();
        match err {
            FormError::TransferOptions { field, .. } => assert_eq!(field, "f"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn at_strings_attach_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.txt"), b"hi").unwrap();
        let record = record_from_json_with_files(
            json!({"doc": "@note.txt", "mail": "@@home", "at": "@"}),
            dir.path(),
        )
        .unwrap();
        match record.get("doc") {
            Some(FieldValue::Stream(p)) => assert_eq!(p.path(), Some(dir.path().join("note.txt").as_path())),
            other => panic!("expected stream, got {other:?}"),
        }
        assert!(matches!(record.get("mail"), Some(FieldValue::Scalar(s)) if s == "@home"));
        assert!(matches!(record.get("at"), Some(FieldValue::Scalar(s)) if s == "@"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = record_from_json_with_files(json!({"doc": "@missing.bin"}), dir.path()).unwrap_err();
        assert!(matches!(err, FormError::Io(_)));
    }

    #[test]
    fn at_strings_are_plain_without_base_dir() {
        let record = record_from_json(json!({"doc": "@note.txt"})).unwrap();
        assert!(matches!(record.get("doc"), Some(FieldValue::Scalar(s)) if s == "@note.txt"));
    }
}

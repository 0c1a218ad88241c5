//! Fixture records from JSON.
//!
//! This module is gated behind the `serde` feature.
//!
//! The input is an array of objects, one object per record. Object key order
//! is kept as the field order. Integral JSON numbers become integers and must
//! fit in an `i64`; other numbers become reals.

use crate::fixture::{Fixture, Record};
use crate::value::Value;

/// Errors raised while reading records from JSON.
#[derive(Debug, thiserror::Error)]
pub enum JsonRecordsError {
    /// The input is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The top-level value is not an array.
    #[error("expected an array of records")]
    NotAnArray,
    /// A record is not a JSON object.
    #[error("record {index} is not an object")]
    NotAnObject {
        /// Position of the record.
        index: usize,
    },
    /// A column holds a nested array or object.
    #[error("record {index}, column `{column}`: nested values are not supported")]
    NestedValue {
        /// Position of the record.
        index: usize,
        /// Offending column.
        column: String,
    },
    /// An integer above `i64::MAX`.
    #[error("record {index}, column `{column}`: number out of range")]
    NumberOutOfRange {
        /// Position of the record.
        index: usize,
        /// Offending column.
        column: String,
    },
}

/// Parse an array of JSON objects into records.
///
/// # Errors
///
/// Returns an error if the input is not an array of flat objects.
pub fn records_from_json(json: &str) -> Result<Vec<Record>, JsonRecordsError> {
    let serde_json::Value::Array(items) = serde_json::from_str::<serde_json::Value>(json)? else {
        return Err(JsonRecordsError::NotAnArray);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let serde_json::Value::Object(object) = item else {
                return Err(JsonRecordsError::NotAnObject { index });
            };
            object
                .into_iter()
                .map(|(column, value)| {
                    let value = convert(index, &column, value)?;
                    Ok((column, value))
                })
                .collect()
        })
        .collect()
}

fn convert(
    index: usize,
    column: &str,
    value: serde_json::Value,
) -> Result<Value, JsonRecordsError> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(b.into()),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Value::Integer(v))
            } else if n.is_u64() {
                Err(JsonRecordsError::NumberOutOfRange {
                    index,
                    column: column.to_string(),
                })
            } else {
                n.as_f64()
                    .map(Value::Real)
                    .ok_or_else(|| JsonRecordsError::NumberOutOfRange {
                        index,
                        column: column.to_string(),
                    })
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s)),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(JsonRecordsError::NestedValue {
                index,
                column: column.to_string(),
            })
        }
    }
}

impl Fixture {
    /// Append records parsed from a JSON array of objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an array of flat objects.
    pub fn with_json_records(self, json: &str) -> Result<Self, JsonRecordsError> {
        Ok(self.with_records(records_from_json(json)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn test_parses_flat_objects() {
        let records =
            records_from_json(r#"[{"id": 1, "name": "x", "score": 1.5, "active": true, "note": null}]"#)
                .unwrap();
        assert_eq!(
            records,
            vec![record! {
                "id" => 1,
                "name" => "x",
                "score" => 1.5,
                "active" => true,
                "note" => Value::Null,
            }]
        );
    }

    #[test]
    fn test_keeps_key_order() {
        let records = records_from_json(r#"[{"z": 1, "a": 2}]"#).unwrap();
        let columns: Vec<_> = records[0].keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["z", "a"]);
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(
            records_from_json(r#"{"id": 1}"#),
            Err(JsonRecordsError::NotAnArray)
        ));
    }

    #[test]
    fn test_rejects_non_object_record() {
        assert!(matches!(
            records_from_json("[1]"),
            Err(JsonRecordsError::NotAnObject { index: 0 })
        ));
    }

    #[test]
    fn test_rejects_nested_values() {
        let err = records_from_json(r#"[{"id": 1}, {"tags": ["a"]}]"#).unwrap_err();
        assert!(matches!(
            err,
            JsonRecordsError::NestedValue { index: 1, ref column } if column == "tags"
        ));
    }

    #[test]
    fn test_rejects_unsigned_overflow() {
        let err = records_from_json(r#"[{"id": 18446744073709551615}]"#).unwrap_err();
        assert!(matches!(err, JsonRecordsError::NumberOutOfRange { index: 0, .. }));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            records_from_json("[{"),
            Err(JsonRecordsError::Json(_))
        ));
    }

    #[test]
    fn test_fixture_with_json_records() {
        let fixture = Fixture::new("users", "users")
            .with_json_records(r#"[{"id": 1}, {"id": 2}]"#)
            .unwrap();
        assert_eq!(fixture.records().len(), 2);
    }
}

//! Conversion between Firestore typed values and plain JSON.
//!
//! Firestore encodes every field as a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "3"}`, `{"mapValue": {"fields": {..}}}`).
//! Timestamps decode to RFC 3339 strings and references to their resource name.

use folder_store_core::StoreError;
use serde_json::{Map, Number, Value};

/// Decode a Firestore `fields` map into a plain JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Value, StoreError> {
    let mut out = Map::with_capacity(fields.len());
    for (name, value) in fields {
        out.insert(name.clone(), decode_value(value)?);
    }
    Ok(Value::Object(out))
}

/// Decode a single Firestore typed value.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("expected a typed value object", value))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| invalid("empty typed value", value))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        "integerValue" => {
            // Integers travel as strings to preserve 64-bit precision.
            let n = match inner {
                Value::String(s) => s
                    .parse::<i64>()
                    .map_err(|_| invalid("bad integerValue", value))?,
                Value::Number(n) => n.as_i64().ok_or_else(|| invalid("bad integerValue", value))?,
                _ => return Err(invalid("bad integerValue", value)),
            };
            Ok(Value::Number(n.into()))
        }
        "doubleValue" => {
            let f = inner
                .as_f64()
                .ok_or_else(|| invalid("bad doubleValue", value))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        "timestampValue" | "stringValue" | "bytesValue" | "referenceValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(StoreError::InvalidData(format!(
            "unsupported Firestore value type: {}",
            other
        ))),
    }
}

/// Encode a plain JSON object as a Firestore `fields` map.
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

/// Encode a plain JSON value as a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    let mut typed = Map::with_capacity(1);
    match value {
        Value::Null => {
            typed.insert("nullValue".to_string(), Value::Null);
        }
        Value::Bool(b) => {
            typed.insert("booleanValue".to_string(), Value::Bool(*b));
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                typed.insert("integerValue".to_string(), Value::String(i.to_string()));
            }
            None => {
                typed.insert(
                    "doubleValue".to_string(),
                    n.as_f64().map(Value::from).unwrap_or(Value::Null),
                );
            }
        },
        Value::String(s) => {
            typed.insert("stringValue".to_string(), Value::String(s.clone()));
        }
        Value::Array(values) => {
            let mut array = Map::with_capacity(1);
            array.insert(
                "values".to_string(),
                Value::Array(values.iter().map(encode_value).collect()),
            );
            typed.insert("arrayValue".to_string(), Value::Object(array));
        }
        Value::Object(fields) => {
            let mut map = Map::with_capacity(1);
            map.insert("fields".to_string(), Value::Object(encode_fields(fields)));
            typed.insert("mapValue".to_string(), Value::Object(map));
        }
    }
    Value::Object(typed)
}

fn invalid(reason: &str, value: &Value) -> StoreError {
    StoreError::InvalidData(format!("{}: {}", reason, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_folder_fields() {
        let fields = json!({
            "userId": {"stringValue": "user-1"},
            "date": {"timestampValue": "2024-03-01T10:00:00.123Z"},
            "status": {"mapValue": {"fields": {
                "id": {"integerValue": "99"},
                "color": {"stringValue": "#EF4444"},
                "label": {"stringValue": "Annulé"}
            }}},
            "documents": {"arrayValue": {"values": [
                {"mapValue": {"fields": {
                    "name": {"stringValue": "cni.pdf"},
                    "type": {"integerValue": "1"}
                }}}
            ]}},
            "products": {"arrayValue": {}},
            "completed": {"booleanValue": true},
            "rate": {"doubleValue": 1.5},
            "pdfLink": {"nullValue": null}
        });

        let decoded = decode_fields(fields.as_object().unwrap()).unwrap();
        assert_eq!(
            decoded,
            json!({
                "userId": "user-1",
                "date": "2024-03-01T10:00:00.123Z",
                "status": {"id": 99, "color": "#EF4444", "label": "Annulé"},
                "documents": [{"name": "cni.pdf", "type": 1}],
                "products": [],
                "completed": true,
                "rate": 1.5,
                "pdfLink": null
            })
        );
    }

    #[test]
    fn test_encode_patch_fields() {
        let fields = json!({
            "numMPR": "MPR-7",
            "documents": [{"name": "a", "type": 1}],
            "completed": true
        });

        let encoded = encode_fields(fields.as_object().unwrap());
        assert_eq!(encoded["numMPR"], json!({"stringValue": "MPR-7"}));
        assert_eq!(encoded["completed"], json!({"booleanValue": true}));
        assert_eq!(
            encoded["documents"],
            json!({"arrayValue": {"values": [
                {"mapValue": {"fields": {
                    "name": {"stringValue": "a"},
                    "type": {"integerValue": "1"}
                }}}
            ]}})
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let err = decode_value(&json!({"vectorValue": {}})).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
        assert!(decode_value(&json!("bare")).is_err());
        assert!(decode_value(&json!({"integerValue": "x1"})).is_err());
    }
}

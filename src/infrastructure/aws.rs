//! Shared AWS SDK plumbing

use std::collections::HashMap;

use aws_smithy_types::{Document as SmithyDocument, Number};
use serde_json::Value;

/// Load the SDK configuration from the default provider chain for `region`
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}

/// Convert serde_json::Value to an AWS Smithy Document
pub fn json_to_document(value: &Value) -> SmithyDocument {
    match value {
        Value::Null => SmithyDocument::Null,
        Value::Bool(b) => SmithyDocument::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                SmithyDocument::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                SmithyDocument::Number(Number::NegInt(i))
            } else {
                SmithyDocument::Number(Number::Float(n.as_f64().unwrap_or_default()))
            }
        }
        Value::String(s) => SmithyDocument::String(s.clone()),
        Value::Array(items) => SmithyDocument::Array(items.iter().map(json_to_document).collect()),
        Value::Object(map) => SmithyDocument::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_document(v)))
                .collect::<HashMap<_, _>>(),
        ),
    }
}

/// Convert AWS Smithy Document to serde_json::Value
pub fn doc_to_json(doc: &SmithyDocument) -> Value {
    match doc {
        SmithyDocument::String(s) => Value::String(s.clone()),
        SmithyDocument::Number(Number::PosInt(u)) => Value::from(*u),
        SmithyDocument::Number(Number::NegInt(i)) => Value::from(*i),
        SmithyDocument::Number(n) => serde_json::json!(n.to_f64_lossy()),
        SmithyDocument::Bool(b) => Value::Bool(*b),
        SmithyDocument::Null => Value::Null,
        SmithyDocument::Array(arr) => Value::Array(arr.iter().map(doc_to_json).collect()),
        SmithyDocument::Object(obj) => {
            let mut map = serde_json::Map::new();

            for (k, v) in obj {
                map.insert(k.clone(), doc_to_json(v));
            }

            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_conversion_preserves_structure() {
        let value = json!({
            "query": "graduation fees",
            "limit": 3,
            "offset": -2,
            "weight": 0.5,
            "confirm": false,
            "tags": ["a", null]
        });

        let doc = json_to_document(&value);
        match &doc {
            SmithyDocument::Object(map) => {
                assert!(matches!(
                    map.get("limit"),
                    Some(SmithyDocument::Number(Number::PosInt(3)))
                ));
                assert!(matches!(
                    map.get("offset"),
                    Some(SmithyDocument::Number(Number::NegInt(-2)))
                ));
            }
            other => panic!("expected object, got {:?}", other),
        }

        assert_eq!(doc_to_json(&doc), value);
    }
}

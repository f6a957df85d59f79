// ABOUTME: Schema-validated tool arguments with typed accessors and serde decoding.
// ABOUTME: Validation covers object shape, required keys, declared property types, and enums.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ToolDispatchError;

/// Arguments of one tool call, already checked against the tool's schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    /// Parse raw JSON argument text and validate it. Empty text means no arguments.
    pub fn parse(raw: &str, schema: &Value) -> Result<Self, ToolDispatchError> {
        let value = if raw.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(raw)
                .map_err(|e| ToolDispatchError::InvalidArguments(format!("not valid JSON: {}", e)))?
        };
        Self::from_value(value, schema)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: Value, schema: &Value) -> Result<Self, ToolDispatchError> {
        let Value::Object(values) = value else {
            return Err(invalid("arguments must be a JSON object"));
        };

        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if values.get(key).is_none_or(Value::is_null) {
                    return Err(invalid(format!("missing required argument '{}'", key)));
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (key, prop) in properties {
                match values.get(key) {
                    None | Some(Value::Null) => {}
                    Some(value) => check_property(key, value, prop)?,
                }
            }
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// A string argument that must be present and non-blank.
    pub fn require_str(&self, key: &str) -> Result<&str, ToolDispatchError> {
        self.str(key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| invalid(format!("'{}' must be a non-empty string", key)))
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(Value::as_u64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Decode into a tool's typed argument struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ToolDispatchError> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| invalid(e.to_string()))
    }
}

fn invalid(message: impl Into<String>) -> ToolDispatchError {
    ToolDispatchError::InvalidArguments(message.into())
}

fn check_property(key: &str, value: &Value, prop: &Value) -> Result<(), ToolDispatchError> {
    if let Some(expected) = prop.get("type").and_then(Value::as_str) {
        let matches = match expected {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };
        if !matches {
            return Err(invalid(format!("'{}' must be of type {}", key, expected)));
        }
    }
    if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let options: Vec<String> = allowed.iter().map(Value::to_string).collect();
            return Err(invalid(format!(
                "'{}' must be one of {}",
                key,
                options.join(", ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "service": {"type": "string"},
                "action": {"type": "string", "enum": ["start", "stop", "restart"]},
                "lines": {"type": "integer"},
                "follow": {"type": "boolean"}
            },
            "required": ["service", "action"]
        })
    }

    #[test]
    fn valid_arguments_parse() {
        let args = ToolArguments::parse(
            r#"{"service":"nginx","action":"restart","lines":20,"explanation":"why"}"#,
            &schema(),
        )
        .unwrap();
        assert_eq!(args.str("service"), Some("nginx"));
        assert_eq!(args.u64("lines"), Some(20));
        assert_eq!(args.bool("follow"), None);
        assert_eq!(args.str("explanation"), Some("why"));
    }

    #[test]
    fn empty_text_is_empty_object() {
        let args = ToolArguments::parse("  ", &json!({"type": "object"})).unwrap();
        assert_eq!(args, ToolArguments::default());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = ToolArguments::parse("{\"service\":", &schema()).unwrap_err();
        assert!(matches!(err, ToolDispatchError::InvalidArguments(m) if m.contains("JSON")));
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(ToolArguments::parse("[1,2]", &schema()).is_err());
    }

    #[test]
    fn missing_required_key_is_rejected() {
        let err = ToolArguments::parse(r#"{"service":"nginx"}"#, &schema()).unwrap_err();
        assert_eq!(
            err,
            ToolDispatchError::InvalidArguments("missing required argument 'action'".into())
        );
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err =
            ToolArguments::parse(r#"{"service":"nginx","action":"stop","lines":"20"}"#, &schema())
                .unwrap_err();
        assert!(matches!(err, ToolDispatchError::InvalidArguments(m) if m.contains("integer")));
    }

    #[test]
    fn enum_violation_is_rejected() {
        let err = ToolArguments::parse(r#"{"service":"nginx","action":"destroy"}"#, &schema())
            .unwrap_err();
        assert!(matches!(err, ToolDispatchError::InvalidArguments(m) if m.contains("one of")));
    }

    #[test]
    fn decode_into_struct() {
        #[derive(Deserialize)]
        struct ServiceArgs {
            service: String,
            action: String,
            #[serde(default)]
            lines: Option<u64>,
        }
        let args =
            ToolArguments::parse(r#"{"service":"sshd","action":"start"}"#, &schema()).unwrap();
        let decoded: ServiceArgs = args.decode().unwrap();
        assert_eq!(decoded.service, "sshd");
        assert_eq!(decoded.action, "start");
        assert!(decoded.lines.is_none());
    }

    #[test]
    fn require_str_rejects_blank() {
        let args = ToolArguments::parse(r#"{"service":" ","action":"start"}"#, &schema()).unwrap();
        assert!(args.require_str("service").is_err());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque JSON body of a record or queued mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordPayload(Value);

impl RecordPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Numeric `id` field, if the payload carries one.
    pub fn numeric_id(&self) -> Option<i64> {
        self.0.get("id").and_then(|id| match id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    }

    pub fn with_id(self, id: i64) -> Self {
        match self.0 {
            Value::Object(mut map) => {
                map.insert("id".to_string(), Value::from(id));
                Self(Value::Object(map))
            }
            other => Self(other),
        }
    }

    /// Drop the `id` field. Creates are sent without their provisional id.
    pub fn without_id(self) -> Self {
        match self.0 {
            Value::Object(mut map) => {
                map.remove("id");
                Self(Value::Object(map))
            }
            other => Self(other),
        }
    }

    fn validate(value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Err("Record payload cannot be null".to_string());
        }
        Ok(())
    }
}

impl From<RecordPayload> for Value {
    fn from(payload: RecordPayload) -> Self {
        payload.0
    }
}

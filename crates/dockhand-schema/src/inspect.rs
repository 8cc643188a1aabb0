//! Typed views over `inspect` output.
//!
//! The engine prints a JSON array with one object per inspected name. Only
//! the fields the harness relies on are modelled; everything else stays in
//! the raw `serde_json::Value`.

use crate::SchemaError;
use serde::Deserialize;
use serde_json::Value;

/// Parse `inspect` stdout and return the first record.
pub fn first_record(stdout: &str) -> Result<Value, SchemaError> {
    let parsed: Value = serde_json::from_str(stdout)
        .map_err(|e| SchemaError::InspectShape(format!("not valid JSON: {e}")))?;
    match parsed {
        Value::Array(mut records) => {
            if records.is_empty() {
                Err(SchemaError::InspectShape("empty result array".to_owned()))
            } else {
                Ok(records.swap_remove(0))
            }
        }
        other => Err(SchemaError::InspectShape(format!(
            "expected an array, got {}",
            type_name(&other)
        ))),
    }
}

/// `State` section of a container record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerStateView {
    pub status: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub dead: bool,
}

impl ContainerStateView {
    pub fn from_record(record: &Value) -> Result<Self, SchemaError> {
        let state = record
            .get("State")
            .ok_or_else(|| SchemaError::InspectShape("missing State".to_owned()))?;
        Self::deserialize(state).map_err(|e| SchemaError::InspectShape(format!("State: {e}")))
    }

    pub fn is_running(&self) -> bool {
        self.status == "running" && !self.paused && !self.dead
    }
}

/// `NetworkSettings.IPAddress` of a container record, if non-empty.
pub fn ip_address(record: &Value) -> Option<&str> {
    record
        .get("NetworkSettings")?
        .get("IPAddress")?
        .as_str()
        .filter(|ip| !ip.is_empty())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

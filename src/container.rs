//! Container attributes as reported by the container runtime's list call.

use serde_json::Value;

use crate::error::{ExtractError, ExtractResult};
use crate::spec::LabelSet;

/// Label carrying the container name.
pub const CONTAINER_NAME_LABEL: &str = "container_name";
/// Label carrying the container id.
pub const CONTAINER_ID_LABEL: &str = "container_id";

/// Identity and raw attributes of one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerAttributes {
    pub id: String,
    pub name: String,
    /// Raw attribute object, e.g. `{"State": "running", "Image": "..."}`.
    pub attrs: Value,
}

impl ContainerAttributes {
    pub fn new(id: impl Into<String>, name: impl Into<String>, attrs: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attrs,
        }
    }

    /// The `State` attribute, if the runtime reported one.
    pub fn state(&self) -> ExtractResult<Option<&str>> {
        match self.attrs.get("State") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ExtractError::Malformed {
                path: "State".to_string(),
                expected: "string",
            }),
        }
    }

    /// Builds base labels for the given label names. Unknown names get the
    /// matching attribute as a string, or an empty value.
    pub fn base_labels(&self, names: &[String]) -> LabelSet {
        let mut labels = LabelSet::new();
        for name in names {
            let value = match name.as_str() {
                CONTAINER_NAME_LABEL => self.name.clone(),
                CONTAINER_ID_LABEL => self.id.clone(),
                other => self
                    .attrs
                    .get(other)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            labels.insert(name.as_str(), value);
        }
        labels
    }
}

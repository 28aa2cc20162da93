//! Prefabs: JSON documents addressed by `namespace/tag`.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prefab {
    pub id: i64,
    pub blueprint_id: i64,
    pub namespace: String,
    pub tag: String,
    pub data: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prefab {
    /// The string other prefabs store to reference this one.
    pub fn uid(&self) -> String {
        format!("{}/{}", self.namespace, self.tag)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrefab {
    pub namespace: String,
    /// Generated when omitted.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub data: JsonValue,
}

impl NewPrefab {
    pub fn validate(&self) -> Result<()> {
        if let Some(tag) = &self.tag {
            if tag.is_empty() || tag.contains('/') {
                return Err(Error::Validation(format!(
                    "Prefab tag '{}' must be non-empty and must not contain '/'",
                    tag
                )));
            }
        }
        if !self.data.is_object() {
            return Err(Error::Validation("Prefab data must be a JSON object".to_string()));
        }
        Ok(())
    }
}

//! Blueprints: the schema and view a namespace of prefabs is created from.

use crate::db::query::scrub::IdentifierClass;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: i64,
    pub name: String,
    pub namespace: String,
    pub schema: JsonValue,
    pub view: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlueprint {
    pub name: String,
    pub namespace: String,
    #[serde(default = "empty_object")]
    pub schema: JsonValue,
    #[serde(default = "empty_object")]
    pub view: JsonValue,
}

impl NewBlueprint {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Blueprint name must not be empty".to_string()));
        }
        if !IdentifierClass::Namespace.matches(&self.namespace) {
            return Err(Error::Validation(format!(
                "Blueprint namespace '{}' must consist of lowercase letters only",
                self.namespace
            )));
        }
        if !self.schema.is_object() {
            return Err(Error::Validation("Blueprint schema must be a JSON object".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_and_validation() {
        let blueprint: NewBlueprint =
            serde_json::from_value(json!({ "name": "Employees", "namespace": "employees" }))
                .unwrap();
        assert_eq!(blueprint.schema, json!({}));
        assert!(blueprint.validate().is_ok());

        let bad: NewBlueprint =
            serde_json::from_value(json!({ "name": "Jobs", "namespace": "Jobs2" })).unwrap();
        assert!(matches!(bad.validate(), Err(Error::Validation(_))));

        let bad: NewBlueprint =
            serde_json::from_value(json!({ "name": " ", "namespace": "jobs" })).unwrap();
        assert!(bad.validate().is_err());
    }
}

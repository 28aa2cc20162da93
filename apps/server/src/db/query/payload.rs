//! Query payload: the `generate` and `filter` keys of a request.

use super::error::QueryError;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generated columns in declaration order.
///
/// Order matters: a generator may refer to any column declared before it.
/// Re-declaring an identifier replaces its formula but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generators(Vec<(String, String)>);

impl Generators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, formula: impl Into<String>) {
        let identifier = identifier.into();
        let formula = formula.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == identifier) {
            Some(entry) => entry.1 = formula,
            None => self.0.push((identifier, formula)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Generators {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut generators = Generators::new();
        for (k, v) in iter {
            generators.insert(k, v);
        }
        generators
    }
}

struct GeneratorsVisitor;

impl<'de> Visitor<'de> for GeneratorsVisitor {
    type Value = Generators;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of column identifiers to formula strings")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut generators = Generators::new();
        while let Some((identifier, formula)) = access.next_entry::<String, String>()? {
            generators.insert(identifier, formula);
        }
        Ok(generators)
    }
}

impl<'de> Deserialize<'de> for Generators {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(GeneratorsVisitor)
    }
}

impl Serialize for Generators {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (identifier, formula) in &self.0 {
            map.serialize_entry(identifier, formula)?;
        }
        map.end()
    }
}

/// One filter formula or an ordered list of them. All filters are ANDed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    One(String),
    Many(Vec<String>),
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec::Many(Vec::new())
    }
}

impl FilterSpec {
    pub fn formulas(&self) -> &[String] {
        match self {
            FilterSpec::One(formula) => std::slice::from_ref(formula),
            FilterSpec::Many(formulas) => formulas,
        }
    }

    pub fn push(&mut self, formula: impl Into<String>) {
        let formula = formula.into();
        match self {
            FilterSpec::One(existing) => {
                *self = FilterSpec::Many(vec![std::mem::take(existing), formula]);
            }
            FilterSpec::Many(formulas) => formulas.push(formula),
        }
    }
}

/// The payload interpreted by [`super::ResourceQuery`]. Other keys that
/// arrive alongside it are ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub generate: Generators,
    #[serde(default)]
    pub filter: FilterSpec,
}

impl QueryPayload {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, QueryError> {
        if !value.is_object() {
            return Err(QueryError::InvalidPayload(
                "query payload must be a JSON object".to_string(),
            ));
        }
        QueryPayload::deserialize(value).map_err(|e| QueryError::InvalidPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generators_keep_declaration_order() {
        let payload = QueryPayload::from_json(&json!({
            "generate": { "zeta": "1", "alpha": "zeta + 1", "mid": "2" }
        }))
        .unwrap();
        let identifiers: Vec<&str> = payload.generate.identifiers().collect();
        assert_eq!(identifiers, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_single_filter_is_one_element_list() {
        let payload = QueryPayload::from_json(&json!({ "filter": "x = 2" })).unwrap();
        assert_eq!(payload.filter.formulas(), &["x = 2".to_string()]);

        let payload = QueryPayload::from_json(&json!({ "filter": ["a = 1", "b = 2"] })).unwrap();
        assert_eq!(payload.filter.formulas().len(), 2);
    }

    #[test]
    fn test_missing_keys_default_to_empty() {
        let payload = QueryPayload::from_json(&json!({ "sort": "-tag" })).unwrap();
        assert!(payload.generate.is_empty());
        assert!(payload.filter.formulas().is_empty());
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(matches!(
            QueryPayload::from_json(&json!({ "generate": { "x": 1 } })),
            Err(QueryError::InvalidPayload(_))
        ));
        assert!(matches!(
            QueryPayload::from_json(&json!({ "filter": 5 })),
            Err(QueryError::InvalidPayload(_))
        ));
        assert!(matches!(
            QueryPayload::from_json(&json!(["x"])),
            Err(QueryError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_filter_push() {
        let mut filter = FilterSpec::default();
        filter.push("a");
        filter.push("b");
        assert_eq!(filter.formulas(), &["a".to_string(), "b".to_string()]);

        let mut filter = FilterSpec::One("a".to_string());
        filter.push("b");
        assert_eq!(filter.formulas().len(), 2);
    }
}

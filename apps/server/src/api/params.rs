//! Prefab query request parsing
//!
//! A query arrives either as a query string on `GET /prefabs`:
//!
//! ```text
//! generate[total]=referent_sum('employees','data.job','data.salary')&filter=total>0&sort=-total&page[limit]=10
//! ```
//!
//! or as the equivalent JSON body on `POST /prefabs/query`:
//!
//! ```json
//! { "generate": { "total": "..." }, "filter": "total > 0", "sort": "-total", "page": { "limit": 10 } }
//! ```
//!
//! Only `generate` and `filter` reach the query compiler; `sort`, `page` and
//! `namespace` are request options handled around it.

use crate::config::QueryConfig;
use crate::db::query::{PrefabSorting, QueryPayload};
use crate::db::Page;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefabQueryRequest {
    pub payload: QueryPayload,
    pub sort: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PageOptions {
    offset: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RequestOptions {
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    page: PageOptions,
    #[serde(default)]
    namespace: Option<String>,
}

fn parse_integer(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("{} must be an integer, got '{}'", key, value)))
}

impl PrefabQueryRequest {
    pub fn from_query_string(query: &str) -> Result<Self> {
        let mut request = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "filter" | "filter[]" => request.payload.filter.push(value.into_owned()),
                "sort" => request.sort = Some(value.into_owned()),
                "namespace" => request.namespace = Some(value.into_owned()),
                "page[offset]" => request.offset = Some(parse_integer(&key, &value)?),
                "page[limit]" => request.limit = Some(parse_integer(&key, &value)?),
                other => {
                    if let Some(identifier) = other
                        .strip_prefix("generate[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    {
                        request.payload.generate.insert(identifier, value.into_owned());
                    }
                }
            }
        }

        Ok(request)
    }

    pub fn from_json(body: &JsonValue) -> Result<Self> {
        let payload = QueryPayload::from_json(body)?;
        let options = RequestOptions::deserialize(body)
            .map_err(|e| Error::Validation(format!("Invalid query options: {}", e)))?;

        Ok(Self {
            payload,
            sort: options.sort,
            offset: options.page.offset,
            limit: options.page.limit,
            namespace: options.namespace,
        })
    }

    pub fn sorting(&self) -> PrefabSorting {
        self.sort
            .as_deref()
            .map(PrefabSorting::parse)
            .unwrap_or_default()
    }

    /// Resolve the page window. The limit is clamped to `max_page_limit`.
    pub fn page(&self, config: &QueryConfig) -> Result<Page> {
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(Error::Validation(format!(
                "page[offset] must not be negative, got {}",
                offset
            )));
        }
        let limit = self.limit.unwrap_or(config.default_page_limit);
        if limit < 1 {
            return Err(Error::Validation(format!(
                "page[limit] must be at least 1, got {}",
                limit
            )));
        }

        Ok(Page {
            offset,
            limit: limit.min(config.max_page_limit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_string() {
        let request = PrefabQueryRequest::from_query_string(
            "generate%5Bx%5D=1%2B1&generate[y]=x*2&filter=x%20%3D%202&filter[]=true&sort=-x&page[offset]=5&page[limit]=10&namespace=jobs",
        )
        .unwrap();

        let generated: Vec<(&str, &str)> = request.payload.generate.iter().collect();
        assert_eq!(generated, vec![("x", "1+1"), ("y", "x*2")]);
        assert_eq!(
            request.payload.filter.formulas(),
            &["x = 2".to_string(), "true".to_string()]
        );
        assert_eq!(request.sort.as_deref(), Some("-x"));
        assert_eq!(request.offset, Some(5));
        assert_eq!(request.limit, Some(10));
        assert_eq!(request.namespace.as_deref(), Some("jobs"));
    }

    #[test]
    fn test_query_string_bad_page() {
        assert!(matches!(
            PrefabQueryRequest::from_query_string("page[limit]=ten"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_json_body() {
        let request = PrefabQueryRequest::from_json(&json!({
            "generate": { "x": "1 + 1" },
            "filter": ["x = 2"],
            "sort": "x",
            "page": { "offset": 2, "limit": 3 }
        }))
        .unwrap();
        assert_eq!(request.payload.generate.len(), 1);
        assert_eq!(request.payload.filter.formulas().len(), 1);
        assert_eq!(request.sort.as_deref(), Some("x"));
        assert_eq!((request.offset, request.limit), (Some(2), Some(3)));
        assert_eq!(request.namespace, None);
    }

    #[test]
    fn test_json_body_errors() {
        assert!(matches!(
            PrefabQueryRequest::from_json(&json!({ "generate": ["x"] })),
            Err(Error::Query(_))
        ));
        assert!(matches!(
            PrefabQueryRequest::from_json(&json!({ "page": { "limit": "many" } })),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_page_clamping() {
        let config = QueryConfig::default();

        let page = PrefabQueryRequest::default().page(&config).unwrap();
        assert_eq!(page, Page { offset: 0, limit: 25 });

        let request = PrefabQueryRequest {
            limit: Some(5000),
            ..Default::default()
        };
        assert_eq!(request.page(&config).unwrap().limit, 1000);

        let request = PrefabQueryRequest {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(request.page(&config).is_err());

        let request = PrefabQueryRequest {
            limit: Some(0),
            ..Default::default()
        };
        assert!(request.page(&config).is_err());
    }
}

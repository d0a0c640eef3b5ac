//! Schema mapper (spec §4.C).
//!
//! Pure, deterministic translation from an arbitrary JSON body to the
//! canonical dependency record set, driven by a caller-supplied
//! `SchemaMapping`. Grounded on the teacher's multi-shape response parsing
//! in `crates/integrations/src/airbnb.rs` (dual-field fallback structs),
//! generalized here to a declarative dotted-path mapping instead of fixed
//! Rust structs, since the mapping is user-configured per service.

use db::models::CanonicalDependency;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fetcher::{HttpFetcher, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};

/// A field mapping: either a dotted path, or a boolean comparison against
/// a dotted path's resolved value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldMapping {
    Path(String),
    BoolCompare { field: String, equals: String },
}

/// The set of field mappings for one dependency's worth of attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFields {
    pub name: FieldMapping,
    pub healthy: FieldMapping,
    #[serde(default)]
    pub latency: Option<FieldMapping>,
    #[serde(default)]
    pub impact: Option<FieldMapping>,
    #[serde(default)]
    pub description: Option<FieldMapping>,
    #[serde(rename = "type", default)]
    pub dependency_type: Option<FieldMapping>,
}

/// `{ root: "dot.path.to.array", fields: { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMapping {
    pub root: String,
    pub fields: SchemaFields,
}

/// Output of a mapping pass: the parsed records plus any non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct MappedResult {
    pub records: Vec<CanonicalDependency>,
    pub warnings: Vec<String>,
}

/// Resolve a dot-separated path against a JSON value. Missing segments
/// yield `None` rather than an error.
fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Coerce a raw JSON value into a tri-state `healthy`, per spec §4.C step 3.
fn coerce_healthy(raw: Option<&Value>, warnings: &mut Vec<String>, row: usize) -> Option<bool> {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => {
            let lower = s.to_lowercase();
            match lower.as_str() {
                "true" | "ok" | "healthy" | "up" => Some(true),
                "false" | "error" | "unhealthy" | "down" | "critical" => Some(false),
                _ => {
                    warnings.push(format!("row {row}: unrecognized healthy value {s:?}"));
                    None
                }
            }
        }
        Some(other) => {
            warnings.push(format!("row {row}: unexpected healthy type {other}"));
            None
        }
    }
}

fn coerce_latency(raw: Option<&Value>, warnings: &mut Vec<String>, row: usize) -> Option<i32> {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => {
            if let Some(f) = n.as_f64() {
                if f < 0.0 {
                    warnings.push(format!("row {row}: negative latency"));
                    None
                } else {
                    Some(f.floor() as i32)
                }
            } else {
                None
            }
        }
        Some(_) => {
            warnings.push(format!("row {row}: non-numeric latency"));
            None
        }
    }
}

fn value_to_opt_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

fn resolve_field(element: &Value, mapping: &FieldMapping) -> Option<Value> {
    match mapping {
        FieldMapping::Path(path) => resolve_path(element, path).cloned(),
        FieldMapping::BoolCompare { field, equals } => {
            let resolved = resolve_path(element, field);
            let matched = match resolved {
                Some(Value::String(s)) => s.to_lowercase() == equals.to_lowercase(),
                Some(other) => other.to_string().to_lowercase() == equals.to_lowercase(),
                None => false,
            };
            Some(Value::Bool(matched))
        }
    }
}

/// Apply a `SchemaMapping` to a parsed JSON body. Pure and deterministic:
/// identical inputs always produce byte-identical outputs (spec invariant 7).
pub fn map_body(body: &Value, schema: &SchemaMapping) -> MappedResult {
    let mut warnings = Vec::new();

    let root = match resolve_path(body, &schema.root) {
        Some(Value::Array(arr)) => arr,
        _ => {
            warnings.push(format!("expected array at {}", schema.root));
            return MappedResult { records: Vec::new(), warnings };
        }
    };

    let mut records = Vec::with_capacity(root.len());

    for (idx, element) in root.iter().enumerate() {
        let name_value = resolve_field(element, &schema.fields.name);
        let name = match name_value {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => {
                warnings.push(format!("row {idx}: missing or empty name, dropped"));
                continue;
            }
        };

        let healthy_raw = resolve_field(element, &schema.fields.healthy);
        let healthy = coerce_healthy(healthy_raw.as_ref(), &mut warnings, idx);

        let latency_raw = schema
            .fields
            .latency
            .as_ref()
            .and_then(|m| resolve_field(element, m));
        let latency_ms = coerce_latency(latency_raw.as_ref(), &mut warnings, idx);

        let impact = schema
            .fields
            .impact
            .as_ref()
            .and_then(|m| resolve_field(element, m))
            .and_then(|v| value_to_opt_string(Some(&v)));

        let description = schema
            .fields
            .description
            .as_ref()
            .and_then(|m| resolve_field(element, m))
            .and_then(|v| value_to_opt_string(Some(&v)));

        let dependency_type = schema
            .fields
            .dependency_type
            .as_ref()
            .and_then(|m| resolve_field(element, m))
            .and_then(|v| value_to_opt_string(Some(&v)));

        records.push(CanonicalDependency {
            name,
            description,
            impact,
            dependency_type,
            healthy,
            health_state: None,
            health_code: None,
            latency_ms,
            error: None,
            error_message: None,
        });
    }

    MappedResult { records, warnings }
}

/// Fetches `url` and applies `schema` without writing anything, for the
/// UI's "Test mapping" feature (spec §6). Never touches the database.
pub async fn dry_run(url: &str, schema: &SchemaMapping) -> MappedResult {
    let fetcher = HttpFetcher::new();
    let fetch = match fetcher.fetch(url, DEFAULT_TIMEOUT, DEFAULT_MAX_BYTES).await {
        Ok(f) => f,
        Err(e) => {
            return MappedResult {
                records: Vec::new(),
                warnings: vec![format!("fetch failed: {e}")],
            }
        }
    };

    let body: Value = match serde_json::from_slice(&fetch.body) {
        Ok(v) => v,
        Err(e) => {
            return MappedResult {
                records: Vec::new(),
                warnings: vec![format!("invalid json: {e}")],
            }
        }
    };

    let mut result = map_body(&body, schema);
    if fetch.truncated {
        result.warnings.push("response body truncated at max_bytes".to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn simple_schema() -> SchemaMapping {
        SchemaMapping {
            root: "checks".to_string(),
            fields: SchemaFields {
                name: FieldMapping::Path("id".to_string()),
                healthy: FieldMapping::Path("ok".to_string()),
                latency: Some(FieldMapping::Path("ms".to_string())),
                impact: None,
                description: None,
                dependency_type: None,
            },
        }
    }

    #[test]
    fn maps_simple_array() {
        let body = json!({ "checks": [{ "id": "db", "ok": true, "ms": 12.7 }] });
        let result = map_body(&body, &simple_schema());
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].name, "db");
        assert_eq!(result.records[0].healthy, Some(true));
        assert_eq!(result.records[0].latency_ms, Some(12));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn missing_root_produces_warning_and_empty_set() {
        let body = json!({ "other": [] });
        let result = map_body(&body, &simple_schema());
        assert!(result.records.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn drops_row_with_missing_name() {
        let body = json!({ "checks": [{ "ok": true }] });
        let result = map_body(&body, &simple_schema());
        assert!(result.records.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn coerces_string_healthy_values() {
        let body = json!({ "checks": [{ "id": "cache", "ok": "DOWN" }] });
        let result = map_body(&body, &simple_schema());
        assert_eq!(result.records[0].healthy, Some(false));
    }

    #[test]
    fn unrecognized_healthy_string_yields_null_and_warning() {
        let body = json!({ "checks": [{ "id": "cache", "ok": "weird" }] });
        let result = map_body(&body, &simple_schema());
        assert_eq!(result.records[0].healthy, None);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn bool_compare_mapping() {
        let schema = SchemaMapping {
            root: "checks".to_string(),
            fields: SchemaFields {
                name: FieldMapping::Path("id".to_string()),
                healthy: FieldMapping::BoolCompare {
                    field: "status".to_string(),
                    equals: "OK".to_string(),
                },
                latency: None,
                impact: None,
                description: None,
                dependency_type: None,
            },
        };
        let body = json!({ "checks": [{ "id": "db", "status": "ok" }] });
        let result = map_body(&body, &schema);
        assert_eq!(result.records[0].healthy, Some(true));
    }

    #[tokio::test]
    async fn dry_run_maps_fetched_body() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "checks": [{ "id": "db", "ok": true, "ms": 3 }] })))
            .mount(&server)
            .await;

        let result = dry_run(&format!("{}/health", server.uri()), &simple_schema()).await;
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].name, "db");
    }

    #[test]
    fn is_deterministic() {
        let body = json!({ "checks": [{ "id": "db", "ok": true, "ms": 5 }] });
        let a = map_body(&body, &simple_schema());
        let b = map_body(&body, &simple_schema());
        assert_eq!(a.records, b.records);
    }
}

//! Health-response parser (spec §4.D).
//!
//! Delegates to the schema mapper when a service has a custom
//! `schema_config`; otherwise parses the built-in default array format.
//! Grounded on the teacher's `crates/integrations/src/airbnb.rs` pattern of
//! accepting several aliased field names for the same logical value
//! (`ListingsResponse { listings, data }`).

use db::models::CanonicalDependency;
use serde::Deserialize;
use serde_json::Value;

use crate::schema_mapper::{map_body, MappedResult, SchemaMapping};

/// One element of the default-format response array.
#[derive(Debug, Deserialize)]
struct DefaultRecord {
    name: String,
    healthy: Option<bool>,
    health: Option<HealthBlock>,
    #[serde(rename = "type")]
    dependency_type: Option<String>,
    impact: Option<String>,
    description: Option<String>,
    #[serde(rename = "healthCode")]
    health_code_alias: Option<i32>,
    #[serde(rename = "latencyMs")]
    latency_ms_alias: Option<i32>,
    #[serde(rename = "healthState")]
    health_state_alias: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct HealthBlock {
    state: Option<i32>,
    code: Option<i32>,
    latency: Option<i32>,
}

/// Parses a raw response body, either via the caller's `schema_config` or
/// the built-in default format.
pub fn parse(body: &[u8], schema_config: Option<&Value>) -> MappedResult {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            return MappedResult {
                records: Vec::new(),
                warnings: vec![format!("invalid json: {e}")],
            }
        }
    };

    if let Some(schema_json) = schema_config {
        let schema: SchemaMapping = match serde_json::from_value(schema_json.clone()) {
            Ok(s) => s,
            Err(e) => {
                return MappedResult {
                    records: Vec::new(),
                    warnings: vec![format!("invalid schema_config: {e}")],
                }
            }
        };
        return map_body(&parsed, &schema);
    }

    parse_default(&parsed)
}

fn parse_default(parsed: &Value) -> MappedResult {
    let array = match parsed.as_array() {
        Some(a) => a,
        None => {
            return MappedResult {
                records: Vec::new(),
                warnings: vec!["expected array at root".to_string()],
            }
        }
    };

    let mut warnings = Vec::new();
    let mut records = Vec::with_capacity(array.len());

    for (idx, element) in array.iter().enumerate() {
        let record: DefaultRecord = match serde_json::from_value(element.clone()) {
            Ok(r) => r,
            Err(e) => {
                warnings.push(format!("row {idx}: {e}, dropped"));
                continue;
            }
        };

        let health_state = record
            .health
            .as_ref()
            .and_then(|h| h.state)
            .or(record.health_state_alias);

        let healthy = record.healthy.or_else(|| health_state.map(|s| s == 0));

        let health_code = record
            .health
            .as_ref()
            .and_then(|h| h.code)
            .or(record.health_code_alias);

        let latency_ms = record
            .health
            .as_ref()
            .and_then(|h| h.latency)
            .or(record.latency_ms_alias);

        records.push(CanonicalDependency {
            name: record.name,
            description: record.description,
            impact: record.impact,
            dependency_type: record.dependency_type,
            healthy,
            health_state,
            health_code,
            latency_ms,
            error: None,
            error_message: None,
        });
    }

    MappedResult { records, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_default_format_with_health_block() {
        let body = json!([
            { "name": "postgres", "health": { "state": 0, "code": 200, "latency": 3 } }
        ]);
        let result = parse(body.to_string().as_bytes(), None);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].healthy, Some(true));
        assert_eq!(result.records[0].latency_ms, Some(3));
    }

    #[test]
    fn parses_flat_aliases() {
        let body = json!([
            { "name": "redis", "healthy": false, "latencyMs": 40, "healthCode": 500 }
        ]);
        let result = parse(body.to_string().as_bytes(), None);
        assert_eq!(result.records[0].healthy, Some(false));
        assert_eq!(result.records[0].latency_ms, Some(40));
        assert_eq!(result.records[0].health_code, Some(500));
    }

    #[test]
    fn invalid_json_yields_warning_not_error() {
        let result = parse(b"not json", None);
        assert!(result.records.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn wrong_root_type_yields_warning() {
        let body = json!({ "not": "an array" });
        let result = parse(body.to_string().as_bytes(), None);
        assert!(result.records.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn unknown_keys_pass_through_silently() {
        let body = json!([
            { "name": "smtp", "healthy": true, "weirdExtraField": 42 }
        ]);
        let result = parse(body.to_string().as_bytes(), None);
        assert_eq!(result.records.len(), 1);
        assert!(result.warnings.is_empty());
    }
}

use crate::types::{CollectorError, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One page of a paginated API response.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePage {
    pub count: u64,
    pub results: Vec<Value>,
    #[serde(default)]
    pub next: Option<Value>,
}

/// Decode a raw page payload. The payload is kept in the error so a bad
/// response can be inspected after the run aborts.
pub fn parse_page(raw: &str) -> Result<RemotePage> {
    debug!("Parsing page payload ({} bytes)", raw.len());
    serde_json::from_str(raw).map_err(|e| CollectorError::parse(format!("bad page format: {}", e), raw))
}

/// Decode a single record returned by an item detail endpoint.
pub fn parse_record(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).map_err(|e| CollectorError::parse(format!("bad record format: {}", e), raw))?;
    if !value.is_object() {
        return Err(CollectorError::parse("record is not a JSON object", raw));
    }
    Ok(value)
}

/// An empty JSON object closes an item's details the same way `EndOfItem` does.
pub fn is_end_marker(raw: &str) -> bool {
    matches!(serde_json::from_str::<Value>(raw), Ok(Value::Object(map)) if map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_with_url_cursor() {
        let page = parse_page(r#"{"count": 45, "results": [{"id": 1}], "next": "https://x/api/2/question/?page=3"}"#).unwrap();
        assert_eq!(page.count, 45);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.next, Some(Value::String("https://x/api/2/question/?page=3".into())));
    }

    #[test]
    fn missing_results_is_a_parse_error_with_payload() {
        let raw = r#"{"count": 45}"#;
        match parse_page(raw) {
            Err(CollectorError::Parse { payload, .. }) => assert_eq!(payload, raw),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(parse_page("<html>"), Err(CollectorError::Parse { .. })));
        assert!(matches!(parse_record("[1, 2]"), Err(CollectorError::Parse { .. })));
    }

    #[test]
    fn only_empty_objects_are_end_markers() {
        assert!(is_end_marker("{}"));
        assert!(is_end_marker(" { } "));
        assert!(!is_end_marker(r#"{"results": []}"#));
        assert!(!is_end_marker("not json"));
    }
}

//! Atlassian Statuspage `summary.json`（Claude、OpenAI、Cfx.re 等）

use super::{http, DataSource, FetchError, RawPayload, Snapshot, SourceProfile};
use crate::config::ModuleConfig;
use crate::types::{slugify, ServiceItem};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_STATUSES: &[&str] = &["degraded_performance", "partial_outage", "major_outage"];

pub struct StatuspageSource {
    config: Arc<ModuleConfig>,
}

impl StatuspageSource {
    pub fn new(config: Arc<ModuleConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataSource for StatuspageSource {
    fn slug(&self) -> &str {
        &self.config.slug
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile::components(DEFAULT_STATUSES, "no components in status response")
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        let data = http::get_json(client, &self.config).await?;
        let items = parse_components(&data);
        Ok(Snapshot::new(RawPayload::Json(data), Ok(items)))
    }
}

/// 提取 `components` 数组
pub fn parse_components(data: &Value) -> Vec<ServiceItem> {
    let Some(components) = data.get("components").and_then(Value::as_array) else {
        return Vec::new();
    };

    components
        .iter()
        .map(|comp| {
            let name = non_empty_str(comp, "name").unwrap_or("unknown");
            let id = non_empty_str(comp, "id")
                .map(str::to_string)
                .unwrap_or_else(|| slugify(name));
            let status = non_empty_str(comp, "status").unwrap_or("unknown");
            ServiceItem::new(id, name, status)
        })
        .collect()
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_components() {
        let data = json!({
            "page": {"name": "Claude"},
            "components": [
                {"id": "k8w3r06qmzrp", "name": "claude.ai", "status": "operational"},
                {"name": "Claude API", "status": "partial_outage"},
                {"id": "x"}
            ]
        });
        let items = parse_components(&data);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, "k8w3r06qmzrp");
        assert_eq!(items[1].id, "claude-api");
        assert_eq!(items[1].status, "partial_outage");
        assert_eq!(items[2].name, "unknown");
        assert_eq!(items[2].status, "unknown");
    }

    #[test]
    fn test_missing_components() {
        assert!(parse_components(&json!({"status": {}})).is_empty());
        assert!(parse_components(&json!([])).is_empty());
    }
}

//! Google Cloud `incidents.json`

use super::{http, DataSource, FetchError, RawPayload, ShapeError, Snapshot, SourceProfile};
use crate::config::ModuleConfig;
use crate::types::ServiceItem;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_STATUSES: &[&str] = &["service_disruption", "service_outage", "service_information"];

pub struct GcpSource {
    config: Arc<ModuleConfig>,
}

impl GcpSource {
    pub fn new(config: Arc<ModuleConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataSource for GcpSource {
    fn slug(&self) -> &str {
        &self.config.slug
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile::incidents(DEFAULT_STATUSES)
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        let data = http::get_json(client, &self.config).await?;
        let items = parse_incidents(&data);
        Ok(Snapshot::new(RawPayload::Json(data), items))
    }
}

/// 提取未结束且有受影响区域的事件，区域 id / 名称作为过滤标签
pub fn parse_incidents(data: &Value) -> Result<Vec<ServiceItem>, ShapeError> {
    let incidents = data.as_array().ok_or(ShapeError::UnexpectedIncidents)?;
    let mut items = Vec::new();

    for incident in incidents.iter().filter(|i| i.is_object()) {
        if str_field(incident, "end").is_some() {
            continue;
        }
        let locations = location_list(incident);
        if locations.is_empty() {
            continue;
        }

        let id = str_field(incident, "id").unwrap_or("incident");
        let name = str_field(incident, "external_desc")
            .or_else(|| str_field(incident, "service_name"))
            .unwrap_or(id);
        let status = str_field(incident, "status_impact")
            .or_else(|| {
                incident
                    .get("most_recent_update")
                    .and_then(|u| str_field(u, "status"))
            })
            .unwrap_or("unknown")
            .to_lowercase();

        let mut regions = Vec::new();
        let mut item = ServiceItem::new(id, name, status);
        for location in locations {
            let loc_id = str_field(location, "id");
            let title = str_field(location, "title");
            if let Some(region) = loc_id.or(title) {
                regions.push(region.to_string());
            }
            item = item.with_tag(loc_id.unwrap_or_default()).with_tag(title.unwrap_or_default());
        }
        items.push(item.with_status_text(regions.join(", ")));
    }

    Ok(items)
}

fn location_list(incident: &Value) -> &[Value] {
    ["currently_affected_locations", "affected_locations"]
        .iter()
        .filter_map(|key| incident.get(*key).and_then(Value::as_array))
        .find(|locations| !locations.is_empty())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open_incidents() {
        let data = json!([
            {
                "id": "abc",
                "external_desc": "Cloud SQL connectivity issues",
                "status_impact": "SERVICE_DISRUPTION",
                "currently_affected_locations": [],
                "affected_locations": [{"id": "us-east1", "title": "South Carolina (us-east1)"}]
            },
            {
                "id": "closed",
                "status_impact": "SERVICE_OUTAGE",
                "end": "2024-01-01T00:00:00+00:00",
                "affected_locations": [{"id": "europe-west1"}]
            },
            {"id": "nowhere", "status_impact": "SERVICE_OUTAGE"}
        ]);
        let items = parse_incidents(&data).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "abc");
        assert_eq!(items[0].status, "service_disruption");
        assert_eq!(items[0].status_text.as_deref(), Some("us-east1"));
        assert!(items[0].matches_filter(&["us-east1".to_string()]));
    }

    #[test]
    fn test_status_from_latest_update() {
        let data = json!([{
            "id": "x",
            "most_recent_update": {"status": "AVAILABLE"},
            "currently_affected_locations": [{"title": "Global"}]
        }]);
        let items = parse_incidents(&data).unwrap();
        assert_eq!(items[0].status, "available");
        assert_eq!(items[0].name, "x");
    }

    #[test]
    fn test_non_list_payload() {
        assert_eq!(parse_incidents(&json!({})), Err(ShapeError::UnexpectedIncidents));
    }
}

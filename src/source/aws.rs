//! AWS Health Dashboard `currentevents`

use super::{http, DataSource, FetchError, RawPayload, ShapeError, Snapshot, SourceProfile, StatusMatch};
use crate::config::ModuleConfig;
use crate::types::ServiceItem;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

const DEFAULT_STATUSES: &[&str] = &["operational_issue"];

pub struct AwsSource {
    config: Arc<ModuleConfig>,
}

impl AwsSource {
    pub fn new(config: Arc<ModuleConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataSource for AwsSource {
    fn slug(&self) -> &str {
        &self.config.slug
    }

    fn profile(&self) -> SourceProfile {
        // typeCode 形如 AWS_EC2_OPERATIONAL_ISSUE，按子串匹配
        SourceProfile::incidents(DEFAULT_STATUSES).with_status_match(StatusMatch::Contains)
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        let data = http::get_json(client, &self.config).await?;
        let items = parse_events(&data);
        Ok(Snapshot::new(RawPayload::Json(data), items))
    }
}

/// 提取仍在进行中的事件（没有 `endTime`）
pub fn parse_events(data: &Value) -> Result<Vec<ServiceItem>, ShapeError> {
    let events = data.as_array().ok_or(ShapeError::UnexpectedIncidents)?;

    Ok(events
        .iter()
        .filter(|event| event.is_object())
        .filter(|event| str_field(event, "endTime").is_none())
        .filter_map(|event| {
            let type_code = str_field(event, "typeCode")?;
            let service = str_field(event, "service").unwrap_or("unknown");
            let region = str_field(event, "region").unwrap_or("global");
            let id = format!("{}-{}", service, region).to_lowercase();
            Some(
                ServiceItem::new(id, format!("{} ({})", service, region), type_code.to_lowercase())
                    .with_status_text(status_code(event, type_code))
                    .with_tag(region)
                    .with_tag(service),
            )
        })
        .collect())
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn status_code(event: &Value, type_code: &str) -> String {
    match event.get("status") {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Null) | None => {}
        Some(other) => return other.to_string(),
    }
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(operational_issue|availability|performance|degradation)").unwrap()
    });
    pattern
        .captures(type_code)
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_active_events() {
        let data = json!([
            {"service": "ec2", "region": "us-east-1", "typeCode": "AWS_EC2_OPERATIONAL_ISSUE", "status": 1},
            {"service": "s3", "region": "eu-west-1", "typeCode": "AWS_S3_OPERATIONAL_ISSUE", "endTime": "1700000000"},
            {"service": "iam", "region": "global"},
            "noise"
        ]);
        let items = parse_events(&data).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "ec2-us-east-1");
        assert_eq!(items[0].status, "aws_ec2_operational_issue");
        assert_eq!(items[0].status_text.as_deref(), Some("1"));
        assert!(items[0].tags.contains(&"us-east-1".to_string()));
    }

    #[test]
    fn test_status_code_from_type_code() {
        let data = json!([{"service": "rds", "region": "ap-south-1", "typeCode": "AWS_RDS_PERFORMANCE_DEGRADATION"}]);
        let items = parse_events(&data).unwrap();
        assert_eq!(items[0].status_text.as_deref(), Some("performance"));
    }

    #[test]
    fn test_non_list_payload() {
        assert_eq!(
            parse_events(&json!({"events": []})),
            Err(ShapeError::UnexpectedIncidents)
        );
    }
}

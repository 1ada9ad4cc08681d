//! Oracle Cloud Infrastructure 事件 RSS

use super::{http, DataSource, FetchError, RawPayload, ShapeError, Snapshot, SourceProfile};
use crate::config::ModuleConfig;
use crate::types::{slugify, ServiceItem};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

const DEFAULT_STATUSES: &[&str] = &["investigating", "identified", "monitoring"];

pub struct OciSource {
    config: Arc<ModuleConfig>,
}

impl OciSource {
    pub fn new(config: Arc<ModuleConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataSource for OciSource {
    fn slug(&self) -> &str {
        &self.config.slug
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile::incidents(DEFAULT_STATUSES)
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        let body = http::get_text(client, &self.config).await?;
        let items = parse_feed(&body);
        Ok(Snapshot::new(RawPayload::Text(body), items))
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// 解析 RSS，标题格式为 `service | region | reference`，
/// 描述中 `<strong>` 内的文本为事件状态
pub fn parse_feed(xml_body: &str) -> Result<Vec<ServiceItem>, ShapeError> {
    let rss: Rss =
        quick_xml::de::from_str(xml_body).map_err(|e| ShapeError::Parse(e.to_string()))?;

    Ok(rss
        .channel
        .items
        .iter()
        .map(|item| {
            let title = item.title.trim();
            let mut parts = title.split('|').map(str::trim);
            let service = parts.next().filter(|s| !s.is_empty()).unwrap_or("unknown");
            let region = parts.next().unwrap_or_default();
            let reference = parts.next().unwrap_or_default();

            let id = if reference.is_empty() { slugify(title) } else { reference.to_string() };
            let name = if region.is_empty() {
                service.to_string()
            } else {
                format!("{} ({})", service, region)
            };
            let status = extract_status(&item.description).unwrap_or_else(|| "unknown".to_string());

            ServiceItem::new(id, name, status.to_lowercase())
                .with_status_text(status)
                .with_tag(service)
                .with_tag(region)
        })
        .collect())
}

fn extract_status(description: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(?i)<strong>([^<]+)</strong>").unwrap());
    pattern
        .captures(description)
        .map(|caps| caps[1].trim().to_string())
}

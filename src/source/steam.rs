//! steamstat.us 页面抓取

use super::{http, DataSource, FetchError, RawPayload, Snapshot, SourceProfile};
use crate::config::ModuleConfig;
use crate::types::ServiceItem;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

const DEFAULT_STATUSES: &[&str] = &["major", "minor"];
const SEVERITIES: &[&str] = &["good", "minor", "major"];
const IGNORED_IDS: &[&str] = &["pageviews"];

pub struct SteamSource {
    config: Arc<ModuleConfig>,
}

impl SteamSource {
    pub fn new(config: Arc<ModuleConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataSource for SteamSource {
    fn slug(&self) -> &str {
        &self.config.slug
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile::components(DEFAULT_STATUSES, "no services found on page")
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        let body = http::get_text(client, &self.config).await?;
        let items = parse_services(&body);
        Ok(Snapshot::new(RawPayload::Text(body), Ok(items)))
    }
}

fn service_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?is)<div class="(?:sep )?service">.*?<span class="name">(.*?)</span>.*?<span class="status ([^"]+)" id="([^"]+)">(.*?)</span>"#,
        )
        .unwrap()
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// 解析页面中的服务块
///
/// 每个服务形如：
/// ```text
/// <div class="service"><span class="name">Store</span>
///   <span class="status good" id="store">Normal</span></div>
/// ```
pub fn parse_services(body: &str) -> Vec<ServiceItem> {
    service_pattern()
        .captures_iter(body)
        .filter_map(|caps| {
            let status_id = caps[3].trim().to_lowercase();
            if IGNORED_IDS.contains(&status_id.as_str()) {
                return None;
            }
            // 去掉链接、svg 等内嵌标签，只保留可见文本
            let name = tag_pattern().replace_all(&caps[1], "").trim().to_string();
            let name = if name.is_empty() { "unknown-service".to_string() } else { name };
            let severity = caps[2]
                .split_whitespace()
                .find(|class| SEVERITIES.contains(class))
                .unwrap_or("unknown");
            Some(
                ServiceItem::new(status_id, name, severity)
                    .with_status_text(caps[4].trim()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="service"><span class="name">Steam Store</span>
            <span class="status good" id="store">Normal</span></div>
        <div class="sep service"><span class="name"><a href="/cm">Steam Connection Managers</a></span>
            <span class="status minor" id="cms">87.1% Online</span></div>
        <div class="service"><span class="name">Page Views</span>
            <span class="status good" id="pageviews">12,345</span></div>
        <div class="service"><span class="name"><svg></svg></span>
            <span class="status major other" id="Community">Offline</span></div>
    "#;

    #[test]
    fn test_parse_services() {
        let items = parse_services(PAGE);
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].id, "store");
        assert_eq!(items[0].name, "Steam Store");
        assert_eq!(items[0].status, "good");
        assert_eq!(items[0].status_text.as_deref(), Some("Normal"));

        assert_eq!(items[1].name, "Steam Connection Managers");
        assert_eq!(items[1].status, "minor");

        assert_eq!(items[2].id, "community");
        assert_eq!(items[2].name, "unknown-service");
        assert_eq!(items[2].status, "major");
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_services("<html><body>maintenance</body></html>").is_empty());
    }
}

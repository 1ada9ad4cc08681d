//! 核心数据类型 - 检测状态、服务条目与判定结果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单次检测的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Ok,
    Alert,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Alert => "ALERT",
            CheckStatus::Error => "ERROR",
        }
    }

    /// 日志级别名称（OK→INFO, ALERT→WARNING, ERROR→ERROR）
    pub fn level_name(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "INFO",
            CheckStatus::Alert => "WARNING",
            CheckStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 数据源中的一个子服务（区域、组件、事件等），每次轮询重新生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: String,
    pub name: String,
    /// 厂商自定义的状态词汇
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// 额外标识（区域、位置），用于服务过滤
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ServiceItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: status.into(),
            status_text: None,
            tags: Vec::new(),
        }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.status_text = Some(text);
        }
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !tag.is_empty() {
            self.tags.push(tag);
        }
        self
    }

    /// 名称的 slug 形式（小写，非字母数字替换为 `-`）
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// 是否命中过滤名单（id / name / slug / tags，大小写不敏感）
    pub fn matches_filter(&self, allow: &[String]) -> bool {
        let id = self.id.to_lowercase();
        let name = self.name.to_lowercase();
        let slug = self.slug();
        allow.iter().any(|entry| {
            let entry = entry.to_lowercase();
            entry == id
                || entry == name
                || entry == slug
                || self.tags.iter().any(|t| t.to_lowercase() == entry)
        })
    }

    /// 渲染给人看的原因文本，如 `Steam Store: Slow (minor)`
    pub fn reason(&self) -> String {
        match &self.status_text {
            Some(text) => format!("{}: {} ({})", self.display_name(), text, self.status),
            None => format!("{}: {}", self.display_name(), self.status),
        }
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// 单个服务的判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceObservation {
    pub item: ServiceItem,
    pub status: CheckStatus,
}

impl ServiceObservation {
    pub fn new(item: ServiceItem, status: CheckStatus) -> Self {
        Self { item, status }
    }
}

/// 一次评估的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: CheckStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// 为空表示整源判定；非空表示需要按服务逐个处理
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceObservation>,
    /// 诊断用的附加数据（例如过滤失败时的完整服务列表）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
}

impl Verdict {
    pub fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            reason: None,
            duration_ms: None,
            services: Vec::new(),
            diagnostics: None,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Ok, message)
    }

    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Alert, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Error, message)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(round_ms(duration_ms));
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceObservation>) -> Self {
        self.services = services;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: serde_json::Value) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// 是否进入服务模式
    pub fn is_service_mode(&self) -> bool {
        !self.services.is_empty()
    }

    /// 处于 ALERT 的服务条目
    pub fn affected_items(&self) -> impl Iterator<Item = &ServiceItem> {
        self.services
            .iter()
            .filter(|s| s.status == CheckStatus::Alert)
            .map(|s| &s.item)
    }

    /// 为单个服务合成判定（用于渲染通知）
    pub fn for_service(&self, observation: &ServiceObservation, message: &str) -> Verdict {
        Verdict {
            status: observation.status,
            message: message.to_string(),
            reason: Some(observation.item.reason()),
            duration_ms: self.duration_ms,
            services: vec![observation.clone()],
            diagnostics: None,
        }
    }
}

/// 去重键：`slug` 或 `slug:service_id`，统一小写
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertKey(String);

impl AlertKey {
    pub fn module(slug: &str) -> Self {
        Self(slug.to_lowercase())
    }

    pub fn service(slug: &str, item: &ServiceItem) -> Self {
        let service_id = if !item.id.is_empty() {
            item.id.clone()
        } else if !item.name.is_empty() {
            item.slug()
        } else {
            "service".to_string()
        };
        Self(format!("{}:{}", slug, service_id).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 是否属于该模块的服务级键
    pub fn is_service_of(&self, slug: &str) -> bool {
        self.0
            .strip_prefix(&slug.to_lowercase())
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl std::fmt::Display for AlertKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

fn round_ms(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Steam Store"), "steam-store");
        assert_eq!(slugify("  API (v2) / Chat  "), "api-v2-chat");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_alert_key_lowercased() {
        let item = ServiceItem::new("US-East-1", "N. Virginia", "major");
        assert_eq!(AlertKey::service("AWS", &item).as_str(), "aws:us-east-1");
        assert_eq!(AlertKey::module("Steam").as_str(), "steam");
    }

    #[test]
    fn test_alert_key_falls_back_to_name_slug() {
        let item = ServiceItem::new("", "Steam Store", "minor");
        assert_eq!(AlertKey::service("steam", &item).as_str(), "steam:steam-store");
    }

    #[test]
    fn test_is_service_of() {
        let item = ServiceItem::new("store", "Store", "good");
        let key = AlertKey::service("steam", &item);
        assert!(key.is_service_of("steam"));
        assert!(!key.is_service_of("ste"));
        assert!(!AlertKey::module("steam").is_service_of("steam"));
    }

    #[test]
    fn test_matches_filter() {
        let item = ServiceItem::new("abc123", "Claude API", "operational").with_tag("us-east1");
        assert!(item.matches_filter(&["claude-api".to_string()]));
        assert!(item.matches_filter(&["ABC123".to_string()]));
        assert!(item.matches_filter(&["US-EAST1".to_string()]));
        assert!(!item.matches_filter(&["console".to_string()]));
    }

    #[test]
    fn test_affected_items_only_alerts() {
        let verdict = Verdict::alert("degraded").with_services(vec![
            ServiceObservation::new(ServiceItem::new("a", "A", "major"), CheckStatus::Alert),
            ServiceObservation::new(ServiceItem::new("b", "B", "good"), CheckStatus::Ok),
        ]);
        let ids: Vec<_> = verdict.affected_items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_item_reason() {
        let item = ServiceItem::new("store", "Store", "minor").with_status_text("Slow");
        assert_eq!(item.reason(), "Store: Slow (minor)");
        assert_eq!(ServiceItem::new("x", "X", "major_outage").reason(), "X: major_outage");
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&CheckStatus::Alert).unwrap(), "\"ALERT\"");
    }
}

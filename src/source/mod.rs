//! 数据源适配器 - 拉取厂商状态页并规范化为服务列表
//!
//! 每个适配器实现 `DataSource`，只负责：
//! 1. 请求一次快照（受模块超时限制）
//! 2. 把原始负载转换为 `ServiceItem` 列表
//!
//! 规则评估由 `rule` 模块统一完成，适配器只通过 `SourceProfile`
//! 声明自己的默认状态集合与过滤语义。

pub mod aws;
pub mod gcp;
pub mod http;
pub mod oci;
pub mod registry;
pub mod statuspage;
pub mod steam;

pub use http::build_http_client;
pub use registry::{SourceFactory, SourceLoadError, SourceRegistry};

use crate::types::ServiceItem;
use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// 拉取失败（网络、超时、HTTP 状态码）
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// 负载结构与规则要求不符
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("unexpected incidents payload")]
    UnexpectedIncidents,

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// 原始负载
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Text(String),
    Json(serde_json::Value),
}

impl RawPayload {
    /// keyword / regex 规则使用的文本（JSON 负载序列化后使用）
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawPayload::Text(body) => Cow::Borrowed(body.as_str()),
            RawPayload::Json(value) => Cow::Owned(value.to_string()),
        }
    }
}

/// 一次拉取的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub raw: RawPayload,
    /// 规范化后的服务列表；结构不符时为 `ShapeError`
    pub items: Result<Vec<ServiceItem>, ShapeError>,
}

impl Snapshot {
    pub fn new(raw: RawPayload, items: Result<Vec<ServiceItem>, ShapeError>) -> Self {
        Self { raw, items }
    }
}

/// 状态 token 的匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMatch {
    /// 状态值完全等于某个 token
    Exact,
    /// 状态值包含某个 token（如 AWS `typeCode`）
    Contains,
}

/// 过滤名单没有命中任何服务时的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// 视为配置错误（组件类数据源）
    Strict,
    /// 视为没有相关事件（事件流类数据源）
    Lenient,
}

/// 数据源在规则评估中的差异
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceProfile {
    /// `rule.value` 为空时使用的目标状态
    pub default_statuses: &'static [&'static str],
    pub status_match: StatusMatch,
    pub filter_policy: FilterPolicy,
    /// 服务列表为空时返回的错误原因；`None` 表示空列表是正常状态
    pub empty_items_error: Option<&'static str>,
}

impl SourceProfile {
    /// 组件类数据源的默认配置
    pub const fn components(default_statuses: &'static [&'static str], empty_error: &'static str) -> Self {
        Self {
            default_statuses,
            status_match: StatusMatch::Exact,
            filter_policy: FilterPolicy::Strict,
            empty_items_error: Some(empty_error),
        }
    }

    /// 事件流类数据源的默认配置
    pub const fn incidents(default_statuses: &'static [&'static str]) -> Self {
        Self {
            default_statuses,
            status_match: StatusMatch::Exact,
            filter_policy: FilterPolicy::Lenient,
            empty_items_error: None,
        }
    }

    pub const fn with_status_match(mut self, status_match: StatusMatch) -> Self {
        self.status_match = status_match;
        self
    }
}

/// 数据源适配器
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 模块 slug（用于日志和去重键）
    fn slug(&self) -> &str;

    /// 规则评估差异
    fn profile(&self) -> SourceProfile;

    /// 拉取一次快照
    async fn fetch(&self, client: &reqwest::Client) -> Result<Snapshot, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_payload_as_text() {
        let raw = RawPayload::Json(serde_json::json!({"status": "Major Outage"}));
        assert!(raw.as_text().contains("Major Outage"));
    }

    #[test]
    fn test_shape_error_messages() {
        assert_eq!(ShapeError::UnexpectedIncidents.to_string(), "unexpected incidents payload");
        assert_eq!(
            ShapeError::Parse("eof".to_string()).to_string(),
            "failed to parse feed: eof"
        );
    }
}

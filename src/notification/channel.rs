//! 通知渠道 trait 定义

use crate::types::{CheckStatus, ServiceItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Alert,
    Recovery,
}

impl NotificationKind {
    /// 对外展示的状态名（webhook 的 `status` 字段）
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Alert => "ALERT",
            NotificationKind::Recovery => "RESOLVED",
        }
    }
}

/// 发给渠道的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub module_id: String,
    pub status: CheckStatus,
    pub message: String,
    pub reason: Option<String>,
    /// 本次事件涉及的服务（整源关键字告警时为空）
    pub affected_items: Vec<ServiceItem>,
    pub duration_ms: Option<f64>,
    pub interval_seconds: u64,
    /// INFO / WARNING
    pub severity_level: String,
    /// monitor_check / monitor_resolved / service_alert / service_resolved
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// 原因文本，缺省时回退到消息
    pub fn reason_or_message(&self) -> &str {
        self.reason
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.message)
    }
}

/// 渠道投递失败
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// 通知渠道 trait
///
/// 投递结果不会影响告警状态，失败只由调用方记录日志。
#[async_trait]
pub trait NotifierChannel: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 一次发送内独立请求的目标数，分发器按此放大超时
    fn targets(&self) -> usize {
        1
    }

    async fn send_alert(&self, event: &AlertEvent) -> Result<(), NotifyError>;

    async fn send_recovery(&self, event: &AlertEvent) -> Result<(), NotifyError>;
}

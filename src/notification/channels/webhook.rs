//! 通用 Webhook 渠道 - 以 JSON 形式 POST 告警事件

use crate::config::WebhookConfig;
use crate::notification::channel::{AlertEvent, NotificationKind, NotifierChannel, NotifyError};
use crate::types::ServiceItem;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Webhook 请求载荷
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub timestamp: String,
    pub level: &'a str,
    pub event: &'a str,
    pub module: &'a str,
    /// ALERT 或 RESOLVED
    pub status: &'static str,
    pub message: &'a str,
    pub reason: Option<&'a str>,
    pub payload: &'a [ServiceItem],
    pub interval_seconds: u64,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(kind: NotificationKind, event: &'a AlertEvent) -> Self {
        Self {
            timestamp: event.timestamp.to_rfc3339(),
            level: &event.severity_level,
            event: &event.event_name,
            module: &event.module_id,
            status: kind.as_str(),
            message: &event.message,
            reason: event.reason.as_deref(),
            payload: &event.affected_items,
            interval_seconds: event.interval_seconds,
        }
    }
}

pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    /// (header 名, token)
    auth: Option<(String, String)>,
}

impl WebhookChannel {
    /// 从配置构造；未配置 URL 时返回 None
    pub fn from_config(client: reqwest::Client, config: &WebhookConfig) -> Option<Self> {
        let url = config.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let auth = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| (config.header_name.clone(), t.to_string()));
        Some(Self {
            client,
            url: url.to_string(),
            auth,
        })
    }

    async fn post(&self, kind: NotificationKind, event: &AlertEvent) -> Result<(), NotifyError> {
        let payload = WebhookPayload::new(kind, event);
        let mut request = self.client.post(&self.url).json(&payload);
        if let Some((header, token)) = &self.auth {
            request = request.header(header.as_str(), token.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), body });
        }

        info!(
            event = "notify",
            module_id = %event.module_id,
            target = "webhook",
            "webhook notification sent"
        );
        Ok(())
    }
}

#[async_trait]
impl NotifierChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send_alert(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        self.post(NotificationKind::Alert, event).await
    }

    async fn send_recovery(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        self.post(NotificationKind::Recovery, event).await
    }
}

//! Telegram Bot API 渠道

use crate::config::TelegramConfig;
use crate::notification::channel::{AlertEvent, NotifierChannel, NotifyError};
use crate::notification::dispatcher::DELIVERY_TIMEOUT;
use crate::notification::formatter::{MessageFormatter, TimestampZone};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Telegram 渠道：对每个 chat_id 调用 `sendMessage`
pub struct TelegramChannel {
    client: reqwest::Client,
    endpoint: String,
    chat_ids: Vec<String>,
    formatter: MessageFormatter,
    chat_timeout: Duration,
}

impl TelegramChannel {
    /// 从配置构造；缺少 token 或 chat_id 时返回 None
    pub fn from_config(client: reqwest::Client, config: &TelegramConfig) -> Option<Self> {
        let token = config.bot_token.as_deref().filter(|t| !t.is_empty())?;
        if config.chat_ids.is_empty() {
            return None;
        }
        Some(Self {
            client,
            endpoint: send_message_url(&config.api_url, token),
            chat_ids: config.chat_ids.clone(),
            formatter: MessageFormatter::new(
                config.timestamp_format.clone(),
                TimestampZone::parse(&config.timestamp_zone),
            ),
            chat_timeout: DELIVERY_TIMEOUT,
        })
    }

    /// 设置每个 chat 的请求超时
    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    /// 逐个 chat 发送；至少一个成功即视为成功
    async fn broadcast(&self, module_id: &str, text: &str) -> Result<(), NotifyError> {
        let mut last_error = None;
        let mut delivered = 0;

        for chat_id in &self.chat_ids {
            match self.send_to(chat_id, text).await {
                Ok(()) => {
                    delivered += 1;
                    info!(
                        event = "notify",
                        module_id = %module_id,
                        target = "telegram",
                        chat_id = %chat_id,
                        "telegram notification sent"
                    );
                }
                Err(e) => {
                    match &e {
                        NotifyError::Rejected { .. } => error!(
                            event = "notify_error",
                            module_id = %module_id,
                            target = "telegram",
                            chat_id = %chat_id,
                            reason = %e,
                            "telegram notification rejected"
                        ),
                        _ => error!(
                            event = "notify_error",
                            module_id = %module_id,
                            target = "telegram",
                            chat_id = %chat_id,
                            reason = %e,
                            "telegram notification failed"
                        ),
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if delivered == 0 => Err(e),
            _ => Ok(()),
        }
    }

    /// 单个 chat 超时不占用后续 chat 的时间
    async fn send_to(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        match tokio::time::timeout(self.chat_timeout, self.post(chat_id, text)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.chat_timeout.as_secs())),
        }
    }

    async fn post(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

#[async_trait]
impl NotifierChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn targets(&self) -> usize {
        self.chat_ids.len()
    }

    async fn send_alert(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let text = self.formatter.format_alert(event);
        self.broadcast(&event.module_id, &text).await
    }

    async fn send_recovery(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let text = self.formatter.format_recovery(event);
        self.broadcast(&event.module_id, &text).await
    }
}

fn send_message_url(api_url: &str, token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token)
}

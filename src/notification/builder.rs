//! 通知系统构建器 - 根据配置注册渠道并创建告警引擎

use super::channel::NotifierChannel;
use super::channels::{TelegramChannel, WebhookChannel};
use super::dispatcher::NotificationDispatcher;
use super::engine::NotificationEngine;
use crate::config::NotificationConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct NotificationBuilder {
    config: NotificationConfig,
    client: reqwest::Client,
    extra: Vec<Arc<dyn NotifierChannel>>,
    delivery_timeout: Option<Duration>,
}

impl NotificationBuilder {
    pub fn new(config: NotificationConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            extra: Vec::new(),
            delivery_timeout: None,
        }
    }

    /// 追加自定义渠道
    pub fn channel(mut self, channel: Arc<dyn NotifierChannel>) -> Self {
        self.extra.push(channel);
        self
    }

    /// 覆盖单次投递超时
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> NotificationEngine {
        let mut dispatcher = NotificationDispatcher::new();
        if let Some(timeout) = self.delivery_timeout {
            dispatcher = dispatcher.with_timeout(timeout);
        }

        // 1. Telegram
        if self.config.telegram.enabled {
            match TelegramChannel::from_config(self.client.clone(), &self.config.telegram) {
                Some(channel) => dispatcher.register_channel(Arc::new(channel)),
                None => warn!(
                    event = "notify_skip",
                    target = "telegram",
                    "telegram notifier missing token or chat_ids; skipping"
                ),
            }
        }

        // 2. Webhook
        if self.config.webhook.enabled {
            match WebhookChannel::from_config(self.client.clone(), &self.config.webhook) {
                Some(channel) => dispatcher.register_channel(Arc::new(channel)),
                None => warn!(
                    event = "notify_skip",
                    target = "webhook",
                    "webhook notifier missing URL; skipping"
                ),
            }
        }

        for channel in self.extra {
            dispatcher.register_channel(channel);
        }

        if dispatcher.channel_count() == 0 {
            info!("No notification channels enabled; alerts are logged only");
        }

        NotificationEngine::new(dispatcher, self.config.repeat_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_channels_by_default() {
        let engine = NotificationBuilder::new(NotificationConfig::default(), reqwest::Client::new()).build();
        assert!(!engine.has_channels());
        assert_eq!(engine.repeat_window(), chrono::Duration::minutes(10));
    }

    #[test]
    fn test_misconfigured_channels_are_skipped() {
        let mut config = NotificationConfig::default();
        config.telegram.enabled = true;
        config.webhook.enabled = true;
        let engine = NotificationBuilder::new(config, reqwest::Client::new()).build();
        assert!(!engine.has_channels());
    }

    #[test]
    fn test_registers_configured_channels() {
        let mut config = NotificationConfig::default();
        config.telegram.enabled = true;
        config.telegram.bot_token = Some("123:abc".to_string());
        config.telegram.chat_ids = vec!["1".to_string(), "2".to_string()];
        config.webhook.enabled = true;
        config.webhook.url = Some("https://hooks.example.com".to_string());
        config.repeat_minutes = 0;

        let engine = NotificationBuilder::new(config, reqwest::Client::new()).build();
        assert_eq!(engine.channel_names(), vec!["telegram", "webhook"]);
        assert_eq!(engine.repeat_window(), chrono::Duration::minutes(1));
    }
}

//! 通知分发器 - 按顺序把事件投递到所有渠道

use super::channel::{AlertEvent, NotificationKind, NotifierChannel, NotifyError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 单个目标的投递超时
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// 通知分发器 - 管理多个渠道
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn NotifierChannel>>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            timeout: DELIVERY_TIMEOUT,
        }
    }

    /// 设置单个目标的投递超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 注册渠道
    pub fn register_channel(&mut self, channel: Arc<dyn NotifierChannel>) {
        info!(channel = channel.name(), "Registering notification channel");
        self.channels.push(channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// 依次投递到每个渠道，返回成功的渠道数
    ///
    /// 渠道之间互不影响：失败或超时只记录日志。
    pub async fn deliver(&self, kind: NotificationKind, event: &AlertEvent) -> usize {
        let mut delivered = 0;

        for channel in &self.channels {
            let send = async {
                match kind {
                    NotificationKind::Alert => channel.send_alert(event).await,
                    NotificationKind::Recovery => channel.send_recovery(event).await,
                }
            };

            let targets = u32::try_from(channel.targets().max(1)).unwrap_or(u32::MAX);
            let budget = self.timeout.saturating_mul(targets);
            let result = match tokio::time::timeout(budget, send).await {
                Ok(result) => result,
                Err(_) => Err(NotifyError::Timeout(budget.as_secs())),
            };

            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    event = "notify_error",
                    channel = channel.name(),
                    module_id = %event.module_id,
                    kind = kind.as_str(),
                    error = %e,
                    "Channel send failed"
                ),
            }
        }

        delivered
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

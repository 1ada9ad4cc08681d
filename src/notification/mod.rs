//! 通知层 - 告警去重状态机与通知渠道
//!
//! # 组成
//! 1. `NotificationEngine`：按 `AlertKey` 维护告警状态，决定发送告警、重复提醒或恢复
//! 2. `NotificationDispatcher`：按顺序投递到每个渠道，单个渠道失败互不影响
//! 3. `NotifierChannel`：渠道接口（Telegram、Webhook）
//!
//! # 使用示例
//! ```ignore
//! use service_monitor::notification::NotificationBuilder;
//!
//! let engine = NotificationBuilder::new(config.notifications.clone(), client).build();
//! engine.handle(&module, &verdict, chrono::Utc::now()).await;
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod dispatcher;
pub mod engine;
pub mod formatter;

pub use builder::NotificationBuilder;
pub use channel::{AlertEvent, NotificationKind, NotifierChannel, NotifyError};
pub use dispatcher::{NotificationDispatcher, DELIVERY_TIMEOUT};
pub use engine::{AlertState, NotificationEngine, MIN_REPEAT_WINDOW};
pub use formatter::{MessageFormatter, TimestampZone};

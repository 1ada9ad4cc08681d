//! 具体通知渠道实现

pub mod telegram;
pub mod webhook;

pub use telegram::TelegramChannel;
pub use webhook::{WebhookChannel, WebhookPayload};

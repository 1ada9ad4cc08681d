//! Service Monitor - 轮询第三方状态页并发送去重后的告警与恢复通知

pub mod config;
pub mod monitor;
pub mod notification;
pub mod rule;
pub mod source;
pub mod types;

pub use config::{AppConfig, ModuleConfig, NotificationConfig, RuleConfig, RuleKind};
pub use monitor::{MonitorLoop, Scheduler, SchedulerError};
pub use notification::{AlertEvent, NotificationBuilder, NotificationEngine, NotifierChannel, NotifyError};
pub use source::{DataSource, FetchError, ShapeError, Snapshot, SourceLoadError, SourceProfile, SourceRegistry};
pub use types::{AlertKey, CheckStatus, ServiceItem, ServiceObservation, Verdict};

//! 告警引擎 - 按 AlertKey 去重、重复提醒与恢复通知
//!
//! 每个键的状态转换：
//!
//! | 判定  | 当前状态                     | 动作                                  |
//! |-------|------------------------------|---------------------------------------|
//! | OK    | ALERTING                     | 发送恢复，→ HEALTHY                   |
//! | OK    | 其他 / 不存在                | → HEALTHY                             |
//! | ERROR | 任意                         | → DEGRADED，`last_alert_at` 保持不变  |
//! | ALERT | 非 ALERTING 或无上次告警时间 | 发送告警，`last_alert_at = now`       |
//! | ALERT | ALERTING 且已超过重复窗口    | 再次发送，`last_alert_at = now`       |
//! | ALERT | ALERTING 且仍在窗口内        | 抑制，状态不变                        |
//!
//! 判定带有服务列表时按服务逐个处理（服务模式），外层状态只用于路由。
//! 状态变更在锁内提交，投递在锁外进行，投递失败不会回滚状态。

use super::channel::{AlertEvent, NotificationKind};
use super::dispatcher::NotificationDispatcher;
use crate::config::ModuleConfig;
use crate::types::{AlertKey, CheckStatus, ServiceItem, ServiceObservation, Verdict};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// 重复窗口下限
pub const MIN_REPEAT_WINDOW: Duration = Duration::from_secs(60);

/// 单个键的告警状态（仅在进程内存中）
#[derive(Debug, Clone, PartialEq)]
pub struct AlertState {
    pub last_status: CheckStatus,
    /// 上次实际发出告警的时间
    pub last_alert_at: Option<DateTime<Utc>>,
    /// 服务键最近一次观测到的条目，用于渲染消失服务的恢复通知
    pub item: Option<ServiceItem>,
}

impl AlertState {
    pub fn is_alerting(&self) -> bool {
        self.last_status == CheckStatus::Alert
    }
}

/// 待投递的通知
#[derive(Debug, Clone)]
struct Pending {
    kind: NotificationKind,
    event: AlertEvent,
}

pub struct NotificationEngine {
    states: Mutex<HashMap<AlertKey, AlertState>>,
    repeat_window: chrono::Duration,
    dispatcher: NotificationDispatcher,
}

impl NotificationEngine {
    /// 创建引擎，重复窗口至少 1 分钟
    pub fn new(dispatcher: NotificationDispatcher, repeat_window: Duration) -> Self {
        let window = repeat_window.max(MIN_REPEAT_WINDOW);
        Self {
            states: Mutex::new(HashMap::new()),
            repeat_window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
            dispatcher,
        }
    }

    pub fn has_channels(&self) -> bool {
        self.dispatcher.channel_count() > 0
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.dispatcher.channel_names()
    }

    pub fn repeat_window(&self) -> chrono::Duration {
        self.repeat_window
    }

    /// 查询某个键的当前状态
    pub async fn state(&self, key: &AlertKey) -> Option<AlertState> {
        self.states.lock().await.get(key).cloned()
    }

    /// 处理一次判定，返回本次发出的通知数量
    pub async fn handle(&self, module: &ModuleConfig, verdict: &Verdict, now: DateTime<Utc>) -> usize {
        let pending = {
            let mut states = self.states.lock().await;
            self.plan(&mut states, module, verdict, now)
        };

        for notification in &pending {
            info!(
                event = "notify",
                module_id = %module.slug,
                kind = notification.kind.as_str(),
                event_name = %notification.event.event_name,
                "Dispatching notification"
            );
            self.dispatcher.deliver(notification.kind, &notification.event).await;
        }

        pending.len()
    }

    fn plan(
        &self,
        states: &mut HashMap<AlertKey, AlertState>,
        module: &ModuleConfig,
        verdict: &Verdict,
        now: DateTime<Utc>,
    ) -> Vec<Pending> {
        let slug = &module.slug;
        let mut pending = Vec::new();

        if !verdict.is_service_mode() {
            let key = AlertKey::module(slug);
            if let Some(kind) = self.transition(states, key, verdict.status, None, now) {
                let event_name = match kind {
                    NotificationKind::Alert => "monitor_check",
                    NotificationKind::Recovery => "monitor_resolved",
                };
                pending.push(Pending {
                    kind,
                    event: build_event(module, verdict, kind, event_name, now),
                });
            }
        }

        let mut observed = HashSet::new();
        for observation in &verdict.services {
            let key = AlertKey::service(slug, &observation.item);
            observed.insert(key.clone());

            let item = Some(observation.item.clone());
            if let Some(kind) = self.transition(states, key, observation.status, item, now) {
                pending.push(service_notification(module, verdict, observation, kind, now));
            }
        }

        // 当前观测集合之外仍在告警的服务视为已恢复
        if verdict.status != CheckStatus::Error {
            let mut vanished: Vec<AlertKey> = states
                .iter()
                .filter(|(key, state)| {
                    state.is_alerting() && key.is_service_of(slug) && !observed.contains(*key)
                })
                .map(|(key, _)| key.clone())
                .collect();
            vanished.sort();

            for key in vanished {
                let item = states.get(&key).and_then(|s| s.item.clone());
                if self.transition(states, key.clone(), CheckStatus::Ok, item.clone(), now).is_some() {
                    let item = item.unwrap_or_else(|| ServiceItem::new(key.as_str(), "", "resolved"));
                    let observation = ServiceObservation::new(item, CheckStatus::Ok);
                    pending.push(service_notification(
                        module,
                        verdict,
                        &observation,
                        NotificationKind::Recovery,
                        now,
                    ));
                }
            }
        }

        pending
    }

    /// 应用状态转换表，返回需要发送的通知类型
    fn transition(
        &self,
        states: &mut HashMap<AlertKey, AlertState>,
        key: AlertKey,
        status: CheckStatus,
        item: Option<ServiceItem>,
        now: DateTime<Utc>,
    ) -> Option<NotificationKind> {
        let current = states.get(&key);
        let was_alerting = current.is_some_and(AlertState::is_alerting);

        match status {
            CheckStatus::Ok => {
                states.insert(key, AlertState { last_status: CheckStatus::Ok, last_alert_at: None, item });
                was_alerting.then_some(NotificationKind::Recovery)
            }
            CheckStatus::Error => {
                let last_alert_at = current.and_then(|s| s.last_alert_at);
                let item = item.or_else(|| current.and_then(|s| s.item.clone()));
                states.insert(key, AlertState { last_status: CheckStatus::Error, last_alert_at, item });
                None
            }
            CheckStatus::Alert => {
                let due = match current.and_then(|s| s.last_alert_at) {
                    Some(last) if was_alerting => now - last >= self.repeat_window,
                    _ => true,
                };
                if !due {
                    debug!(key = %key, "Alert suppressed within repeat window");
                    return None;
                }
                states.insert(key, AlertState { last_status: CheckStatus::Alert, last_alert_at: Some(now), item });
                Some(NotificationKind::Alert)
            }
        }
    }
}

fn service_notification(
    module: &ModuleConfig,
    verdict: &Verdict,
    observation: &ServiceObservation,
    kind: NotificationKind,
    now: DateTime<Utc>,
) -> Pending {
    let (message, event_name) = match kind {
        NotificationKind::Alert => ("service degraded", "service_alert"),
        NotificationKind::Recovery => ("service restored", "service_resolved"),
    };
    let service_verdict = verdict.for_service(observation, message);
    Pending {
        kind,
        event: build_event(module, &service_verdict, kind, event_name, now),
    }
}

fn build_event(
    module: &ModuleConfig,
    verdict: &Verdict,
    kind: NotificationKind,
    event_name: &str,
    now: DateTime<Utc>,
) -> AlertEvent {
    let (status, severity_level, affected_items) = match kind {
        NotificationKind::Alert => (
            CheckStatus::Alert,
            CheckStatus::Alert.level_name(),
            verdict.affected_items().cloned().collect(),
        ),
        NotificationKind::Recovery => (
            CheckStatus::Ok,
            CheckStatus::Ok.level_name(),
            verdict.services.iter().map(|s| s.item.clone()).collect(),
        ),
    };

    AlertEvent {
        module_id: module.slug.clone(),
        status,
        message: verdict.message.clone(),
        reason: verdict.reason.clone(),
        affected_items,
        duration_ms: verdict.duration_ms,
        interval_seconds: module.interval_seconds,
        severity_level: severity_level.to_string(),
        event_name: event_name.to_string(),
        timestamp: now,
    }
}

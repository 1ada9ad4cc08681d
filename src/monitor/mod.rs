//! 监控循环 - 每个数据源一个常驻任务
//!
//! 每一轮：拉取（受模块超时约束）→ 规则评估 → 记录日志 → 交给告警引擎，
//! 然后固定休眠 `max(interval, 1s)`。单轮内的任何失败都只产生 ERROR 判定，
//! 只有取消信号能结束循环。

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerError};

use crate::config::ModuleConfig;
use crate::notification::NotificationEngine;
use crate::rule;
use crate::source::{DataSource, FetchError};
use crate::types::{CheckStatus, Verdict};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct MonitorLoop {
    source: Arc<dyn DataSource>,
    config: Arc<ModuleConfig>,
    client: reqwest::Client,
    engine: Arc<NotificationEngine>,
    verdicts: Option<UnboundedSender<Verdict>>,
}

impl MonitorLoop {
    pub fn new(
        source: Arc<dyn DataSource>,
        config: Arc<ModuleConfig>,
        client: reqwest::Client,
        engine: Arc<NotificationEngine>,
    ) -> Self {
        Self {
            source,
            config,
            client,
            engine,
            verdicts: None,
        }
    }

    /// 每轮判定的副本发送到该通道（用于观察循环）
    pub fn with_verdict_sink(mut self, sink: UnboundedSender<Verdict>) -> Self {
        self.verdicts = Some(sink);
        self
    }

    pub fn slug(&self) -> &str {
        &self.config.slug
    }

    /// 执行一次拉取与评估并记录日志，不发送通知
    pub async fn run_cycle(&self) -> Verdict {
        let slug = &self.config.slug;
        let timeout = self.config.timeout();
        let started = Instant::now();

        let fetched = match tokio::time::timeout(timeout, self.source.fetch(&self.client)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let verdict = match fetched {
            Ok(snapshot) => rule::evaluate(&snapshot, &self.config, &self.source.profile()),
            Err(e) => Verdict::error(format!("{} status request failed", slug)).with_reason(e.to_string()),
        }
        .with_duration_ms(elapsed_ms);

        log_verdict(&self.config, &verdict);
        verdict
    }

    /// 完整的一轮：评估后交给告警引擎
    pub async fn tick(&self) -> Verdict {
        let verdict = self.run_cycle().await;
        self.engine.handle(&self.config, &verdict, Utc::now()).await;
        if let Some(sink) = &self.verdicts {
            let _ = sink.send(verdict.clone());
        }
        verdict
    }

    /// 常驻运行直到取消
    pub async fn run(self, token: CancellationToken) {
        let interval = self.config.interval();
        info!(
            module_id = %self.config.slug,
            interval_seconds = interval.as_secs(),
            "Monitor loop started"
        );

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,
                _ = self.tick() => {}
            }

            tokio::select! {
                biased;

                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!(module_id = %self.config.slug, "Monitor loop cancelled");
    }
}

fn log_verdict(config: &ModuleConfig, verdict: &Verdict) {
    let reason = verdict.reason.as_deref().unwrap_or_default();
    let duration_ms = verdict.duration_ms.unwrap_or_default();
    match verdict.status {
        CheckStatus::Ok => info!(
            event = "monitor_check",
            module_id = %config.slug,
            status = %verdict.status,
            duration_ms,
            interval_seconds = config.interval_seconds,
            "{}",
            verdict.message
        ),
        CheckStatus::Alert => warn!(
            event = "monitor_check",
            module_id = %config.slug,
            status = %verdict.status,
            reason,
            duration_ms,
            interval_seconds = config.interval_seconds,
            "{}",
            verdict.message
        ),
        CheckStatus::Error => error!(
            event = "monitor_check",
            module_id = %config.slug,
            status = %verdict.status,
            reason,
            duration_ms,
            interval_seconds = config.interval_seconds,
            diagnostics = ?verdict.diagnostics,
            "{}",
            verdict.message
        ),
    }
}

//! 调度器 - 为每个数据源启动一个监控循环并等待它们结束
//!
//! 构造失败的数据源会被跳过；一个循环 panic 只记录日志，不影响其他循环。

use super::MonitorLoop;
use crate::config::ModuleConfig;
use crate::notification::NotificationEngine;
use crate::source::SourceRegistry;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no monitor modules could be loaded")]
    NoSources,
}

pub struct Scheduler {
    loops: Vec<MonitorLoop>,
}

impl Scheduler {
    /// 由已构造的循环创建调度器
    pub fn new(loops: Vec<MonitorLoop>) -> Result<Self, SchedulerError> {
        if loops.is_empty() {
            return Err(SchedulerError::NoSources);
        }
        Ok(Self { loops })
    }

    /// 按配置构造数据源；失败的模块记录错误后跳过
    pub fn load<I>(
        modules: I,
        registry: &SourceRegistry,
        client: reqwest::Client,
        engine: Arc<NotificationEngine>,
    ) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = ModuleConfig>,
    {
        let mut loops = Vec::new();

        for module in modules {
            if !module.enabled {
                debug!(module_id = %module.slug, "Module disabled; skipping");
                continue;
            }

            let config = Arc::new(module);
            match registry.build(config.clone()) {
                Ok(source) => {
                    info!(
                        event = "module_load",
                        module_id = %config.slug,
                        adapter = %config.adapter,
                        interval_seconds = config.interval_seconds,
                        "Module loaded"
                    );
                    loops.push(MonitorLoop::new(source, config, client.clone(), engine.clone()));
                }
                Err(e) => error!(
                    event = "module_skip",
                    module_id = %config.slug,
                    error = %e,
                    "Failed to load module"
                ),
            }
        }

        Self::new(loops)
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.loops.iter().map(MonitorLoop::slug).collect()
    }

    /// 运行所有循环，直到取消信号到达且所有循环退出
    pub async fn run(self, token: CancellationToken) {
        let mut tasks = JoinSet::new();

        for monitor in self.loops {
            let slug = monitor.slug().to_string();
            let child = token.child_token();
            // 内层任务承接 panic，外层任务总能带回模块名
            tasks.spawn(async move {
                let result = tokio::spawn(monitor.run(child)).await;
                (slug, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slug, Ok(()))) => debug!(module_id = %slug, "Monitor loop exited"),
                Ok((slug, Err(e))) if e.is_panic() => error!(
                    module_id = %slug,
                    error = %e,
                    "Monitor loop panicked; remaining modules keep running"
                ),
                Ok((slug, Err(e))) => warn!(module_id = %slug, error = %e, "Monitor loop aborted"),
                Err(e) => error!(error = %e, "Monitor supervisor task failed"),
            }
        }

        info!("All monitor loops stopped");
    }
}

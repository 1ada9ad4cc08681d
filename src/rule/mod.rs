//! 规则评估 - 把一次快照转换为 `Verdict`
//!
//! 三种策略由 `rule.kind` 选择：
//! - `status`: 按服务状态匹配（需要规范化的服务列表）
//! - `keyword`: 原始负载中大小写不敏感的子串匹配
//! - `regex`: 原始负载上的大小写不敏感正则匹配
//!
//! 评估永远不会失败：所有错误都转换为 ERROR 判定，
//! 监控循环总能继续记录日志并通知。

mod status;
mod text;

pub use status::evaluate_status;
pub use text::{evaluate_keyword, evaluate_regex};

use crate::config::{ModuleConfig, RuleKind};
use crate::source::{ShapeError, Snapshot, SourceProfile};
use crate::types::{CheckStatus, ServiceItem, ServiceObservation, Verdict};
use thiserror::Error;

/// 规则配置错误或负载结构错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    #[error("unsupported rule kind '{0}'")]
    UnsupportedKind(String),

    #[error("no target components matched filter")]
    NoFilterMatch {
        items: Vec<ServiceItem>,
        filter: Vec<String>,
    },

    #[error("{0}")]
    NoItems(&'static str),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// 策略的评估结果（不含模块相关的消息文本）
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: CheckStatus,
    pub reason: Option<String>,
    pub services: Vec<ServiceObservation>,
}

impl Classification {
    pub fn ok() -> Self {
        Self { status: CheckStatus::Ok, reason: None, services: Vec::new() }
    }

    pub fn alert(reason: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Alert,
            reason: Some(reason.into()),
            services: Vec::new(),
        }
    }
}

/// 按模块规则评估快照
pub fn evaluate(snapshot: &Snapshot, module: &ModuleConfig, profile: &SourceProfile) -> Verdict {
    let slug = &module.slug;
    let rule = &module.rule;

    let result = match &rule.kind {
        RuleKind::Status => evaluate_status(snapshot, module, profile),
        RuleKind::Keyword => Ok(evaluate_keyword(&snapshot.raw.as_text(), &rule.value)),
        RuleKind::Regex => evaluate_regex(&snapshot.raw.as_text(), &rule.value),
        RuleKind::Unsupported(kind) => Err(RuleError::UnsupportedKind(kind.clone())),
    };

    match result {
        Ok(classification) => {
            let message = match classification.status {
                CheckStatus::Alert => format!("{} status degraded", slug),
                _ => format!("{} status healthy", slug),
            };
            let mut verdict =
                Verdict::new(classification.status, message).with_services(classification.services);
            verdict.reason = classification.reason;
            verdict
        }
        Err(err) => error_verdict(slug, err),
    }
}

fn error_verdict(slug: &str, err: RuleError) -> Verdict {
    let verdict = Verdict::error(format!("{} rule evaluation failed", slug)).with_reason(err.to_string());
    match err {
        RuleError::NoFilterMatch { items, filter } => verdict.with_diagnostics(serde_json::json!({
            "services": items,
            "filter": filter,
        })),
        _ => verdict,
    }
}

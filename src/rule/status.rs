//! 状态匹配策略

use super::{Classification, RuleError};
use crate::config::ModuleConfig;
use crate::source::{FilterPolicy, Snapshot, SourceProfile, StatusMatch};
use crate::types::{CheckStatus, ServiceItem, ServiceObservation};

/// 按服务状态评估
///
/// 1. 空服务列表：组件类数据源视为错误，事件流视为正常
/// 2. 先应用过滤名单；严格模式下名单非空却无命中视为配置错误
/// 3. 状态命中目标集合的服务为 ALERT，其余为 OK
pub fn evaluate_status(
    snapshot: &Snapshot,
    module: &ModuleConfig,
    profile: &SourceProfile,
) -> Result<Classification, RuleError> {
    let items = snapshot.items.as_ref().map_err(|e| RuleError::Shape(e.clone()))?;

    if items.is_empty() {
        if let Some(reason) = profile.empty_items_error {
            return Err(RuleError::NoItems(reason));
        }
    }

    let filter = &module.service_filter;
    let filtered: Vec<&ServiceItem> = if filter.is_empty() {
        items.iter().collect()
    } else {
        items.iter().filter(|item| item.matches_filter(filter)).collect()
    };

    if !filter.is_empty() && filtered.is_empty() && profile.filter_policy == FilterPolicy::Strict {
        return Err(RuleError::NoFilterMatch {
            items: items.clone(),
            filter: filter.clone(),
        });
    }

    let mut targets = module.rule.tokens();
    if targets.is_empty() {
        targets = profile.default_statuses.iter().map(|s| s.to_string()).collect();
    }

    let services: Vec<ServiceObservation> = filtered
        .into_iter()
        .map(|item| {
            let status = if status_matches(&item.status, &targets, profile.status_match) {
                CheckStatus::Alert
            } else {
                CheckStatus::Ok
            };
            ServiceObservation::new(item.clone(), status)
        })
        .collect();

    let reasons: Vec<String> = services
        .iter()
        .filter(|s| s.status == CheckStatus::Alert)
        .map(|s| s.item.reason())
        .collect();

    if reasons.is_empty() {
        Ok(Classification { status: CheckStatus::Ok, reason: None, services })
    } else {
        Ok(Classification {
            status: CheckStatus::Alert,
            reason: Some(reasons.join(", ")),
            services,
        })
    }
}

fn status_matches(status: &str, targets: &[String], mode: StatusMatch) -> bool {
    let status = status.to_lowercase();
    if status.is_empty() {
        return false;
    }
    match mode {
        StatusMatch::Exact => targets.iter().any(|t| *t == status),
        StatusMatch::Contains => targets.iter().any(|t| status.contains(t.as_str())),
    }
}

//! 消息格式化 - 将告警事件渲染为 Telegram HTML 文本
//!
//! 三种布局：
//! - 通用告警：状态、原因列表、耗时、间隔
//! - Steam 告警：逐个服务列出状态文本与严重程度
//! - 恢复通知

use super::channel::AlertEvent;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use std::fmt::Write;

const NO_DETAILS: &str = "no details";

/// 时间戳显示时区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampZone {
    Utc,
    Local,
}

impl TimestampZone {
    /// `LOCAL`（不区分大小写）为本地时区，其余均为 UTC
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("local") {
            TimestampZone::Local
        } else {
            TimestampZone::Utc
        }
    }
}

/// 消息格式化器
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    timestamp_format: String,
    zone: TimestampZone,
}

impl MessageFormatter {
    pub fn new(timestamp_format: impl Into<String>, zone: TimestampZone) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
            zone,
        }
    }

    /// 渲染告警；`steam` 模块使用逐服务布局
    pub fn format_alert(&self, event: &AlertEvent) -> String {
        if event.module_id.eq_ignore_ascii_case("steam") && !event.affected_items.is_empty() {
            self.format_steam_alert(event)
        } else {
            self.format_generic_alert(event)
        }
    }

    pub fn format_recovery(&self, event: &AlertEvent) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "✅ <b>{} recovered</b>", escape_html(&event.module_id.to_uppercase()));
        let _ = writeln!(out, "<b>Message:</b> {}", escape_html(non_empty(&event.message)));
        if let Some(reason) = event.reason.as_deref().filter(|r| !r.is_empty()) {
            let _ = writeln!(out, "<b>Service:</b> {}", escape_html(reason));
        }
        let _ = write!(out, "<b>Time:</b> {}", escape_html(&self.format_timestamp(event.timestamp)));
        out
    }

    fn format_generic_alert(&self, event: &AlertEvent) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🚨 <b>{} alert</b>", escape_html(&event.module_id.to_uppercase()));
        let _ = writeln!(out, "<b>Status:</b> {}", event.status);
        let _ = writeln!(out, "<b>Message:</b> {}", escape_html(non_empty(&event.message)));

        let reasons = split_reason(event.reason_or_message());
        if reasons.len() > 1 {
            let _ = writeln!(out, "<b>Reason:</b>");
            for reason in &reasons {
                let _ = writeln!(out, "• {}", escape_html(reason));
            }
        } else {
            let reason = reasons.first().map(String::as_str).unwrap_or(NO_DETAILS);
            let _ = writeln!(out, "<b>Reason:</b> {}", escape_html(reason));
        }

        let _ = writeln!(out, "<b>Duration:</b> {} ms", format_duration(event.duration_ms));
        let _ = writeln!(out, "<b>Interval:</b> {}s", event.interval_seconds);
        let _ = write!(out, "<b>Time:</b> {}", escape_html(&self.format_timestamp(event.timestamp)));
        out
    }

    fn format_steam_alert(&self, event: &AlertEvent) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🚨 <b>Steam status alert</b>");
        for item in &event.affected_items {
            let text = item.status_text.as_deref().unwrap_or_default();
            let _ = writeln!(
                out,
                "• <b>{}</b>: {} ({})",
                escape_html(&item.name),
                escape_html(text),
                escape_html(&item.status.to_uppercase())
            );
        }
        let _ = writeln!(out, "<b>Duration:</b> {} ms", format_duration(event.duration_ms));
        let _ = write!(out, "<b>Time:</b> {}", escape_html(&self.format_timestamp(event.timestamp)));
        out
    }

    /// 按配置格式渲染时间戳，格式无效时回退为 RFC 3339
    pub fn format_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        let items: Vec<Item> = StrftimeItems::new(&self.timestamp_format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return self.fallback_timestamp(timestamp);
        }

        let mut out = String::new();
        let written = match self.zone {
            TimestampZone::Utc => write!(out, "{}", timestamp.format_with_items(items.iter())),
            TimestampZone::Local => write!(
                out,
                "{}",
                timestamp.with_timezone(&Local).format_with_items(items.iter())
            ),
        };
        match written {
            Ok(()) => out,
            Err(_) => self.fallback_timestamp(timestamp),
        }
    }

    fn fallback_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        match self.zone {
            TimestampZone::Utc => timestamp.to_rfc3339(),
            TimestampZone::Local => timestamp.with_timezone(&Local).to_rfc3339(),
        }
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new("%Y-%m-%d %H:%M:%S %Z", TimestampZone::Utc)
    }
}

fn non_empty(value: &str) -> &str {
    if value.trim().is_empty() {
        NO_DETAILS
    } else {
        value
    }
}

fn split_reason(reason: &str) -> Vec<String> {
    reason
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn format_duration(duration_ms: Option<f64>) -> String {
    format!("{:.2}", duration_ms.unwrap_or(0.0))
}

/// Telegram HTML 模式下需要转义的字符
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckStatus, ServiceItem};
    use chrono::TimeZone;

    fn event(module_id: &str) -> AlertEvent {
        AlertEvent {
            module_id: module_id.to_string(),
            status: CheckStatus::Alert,
            message: format!("{} status degraded", module_id),
            reason: Some("API: major_outage, Console: partial_outage".to_string()),
            affected_items: vec![],
            duration_ms: Some(123.456),
            interval_seconds: 60,
            severity_level: "WARNING".to_string(),
            event_name: "monitor_check".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_generic_alert_layout() {
        let text = MessageFormatter::default().format_alert(&event("claude"));
        assert!(text.starts_with("🚨 <b>CLAUDE alert</b>"));
        assert!(text.contains("<b>Status:</b> ALERT"));
        assert!(text.contains("• API: major_outage\n• Console: partial_outage"));
        assert!(text.contains("<b>Duration:</b> 123.46 ms"));
        assert!(text.contains("<b>Interval:</b> 60s"));
        assert!(text.ends_with("<b>Time:</b> 2024-05-01 12:30:00 UTC"));
    }

    #[test]
    fn test_single_reason_inline() {
        let mut e = event("claude");
        e.reason = Some("keyword 'outage' detected".to_string());
        let text = MessageFormatter::default().format_alert(&e);
        assert!(text.contains("<b>Reason:</b> keyword 'outage' detected"));
    }

    #[test]
    fn test_steam_layout() {
        let mut e = event("steam");
        e.affected_items = vec![ServiceItem::new("cms", "Connection Managers", "minor")
            .with_status_text("87% Online")];
        let text = MessageFormatter::default().format_alert(&e);
        assert!(text.starts_with("🚨 <b>Steam status alert</b>"));
        assert!(text.contains("• <b>Connection Managers</b>: 87% Online (MINOR)"));
    }

    #[test]
    fn test_recovery_layout() {
        let mut e = event("claude");
        e.status = CheckStatus::Ok;
        e.message = "service restored".to_string();
        e.reason = Some("API: operational".to_string());
        let text = MessageFormatter::default().format_recovery(&e);
        assert!(text.starts_with("✅ <b>CLAUDE recovered</b>"));
        assert!(text.contains("<b>Service:</b> API: operational"));
    }

    #[test]
    fn test_html_escaped() {
        let mut e = event("claude");
        e.reason = Some("<script>".to_string());
        let text = MessageFormatter::default().format_alert(&e);
        assert!(text.contains("&lt;script&gt;"));
        assert!(!text.contains("<script>"));
    }

    #[test]
    fn test_custom_timestamp_format() {
        let formatter = MessageFormatter::new("%d/%m %H:%M", TimestampZone::Utc);
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(formatter.format_timestamp(ts), "01/05 12:30");
    }

    #[test]
    fn test_invalid_timestamp_format_falls_back() {
        let formatter = MessageFormatter::new("%Q %", TimestampZone::Utc);
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(formatter.format_timestamp(ts), "2024-05-01T12:30:00+00:00");
    }

    #[test]
    fn test_zone_parse() {
        assert_eq!(TimestampZone::parse("local"), TimestampZone::Local);
        assert_eq!(TimestampZone::parse(" LOCAL "), TimestampZone::Local);
        assert_eq!(TimestampZone::parse("UTC"), TimestampZone::Utc);
        assert_eq!(TimestampZone::parse("bogus"), TimestampZone::Utc);
    }
}

//! 配置加载 - 从环境变量读取模块与通知配置
//!
//! 所有配置在启动时加载一次，之后不再修改。
//! 数值或布尔值格式错误时回退到默认值。

mod env_file;

pub use env_file::{parse_env_file, read_env_file};

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 10.0;
pub const DEFAULT_USER_AGENT: &str = "service-monitor/1.0";
pub const DEFAULT_REPEAT_MINUTES: u64 = 10;

/// 规则类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Status,
    Keyword,
    Regex,
    /// 未识别的规则类型，评估时返回 ERROR
    Unsupported(String),
}

impl RuleKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "status" => RuleKind::Status,
            "keyword" => RuleKind::Keyword,
            "regex" => RuleKind::Regex,
            other => RuleKind::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuleKind::Status => "status",
            RuleKind::Keyword => "keyword",
            RuleKind::Regex => "regex",
            RuleKind::Unsupported(kind) => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleConfig {
    pub kind: RuleKind,
    pub value: String,
}

impl RuleConfig {
    pub fn new(kind: RuleKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }

    /// 逗号分隔的目标 token（小写、去空白）
    pub fn tokens(&self) -> Vec<String> {
        split_list(&self.value)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect()
    }
}

/// 默认值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefaultConfig {
    pub interval_seconds: u64,
    pub timeout_seconds: f64,
    pub user_agent: String,
}

impl DefaultConfig {
    /// 共享客户端的请求超时
    pub fn timeout(&self) -> Duration {
        timeout_or_default(self.timeout_seconds)
    }
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// 单个数据源的配置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleConfig {
    pub slug: String,
    /// 使用的适配器名称（默认与 slug 相同）
    pub adapter: String,
    pub url: String,
    pub interval_seconds: u64,
    pub timeout_seconds: f64,
    pub user_agent: String,
    pub rule: RuleConfig,
    /// 服务过滤名单（已转小写）
    pub service_filter: Vec<String>,
    pub enabled: bool,
}

impl ModuleConfig {
    /// 以默认值创建模块配置
    pub fn new(slug: impl Into<String>, url: impl Into<String>) -> Self {
        let slug = slug.into().to_lowercase();
        let defaults = DefaultConfig::default();
        Self {
            adapter: slug.clone(),
            slug,
            url: url.into(),
            interval_seconds: defaults.interval_seconds,
            timeout_seconds: defaults.timeout_seconds,
            user_agent: defaults.user_agent,
            rule: RuleConfig::new(RuleKind::Status, "major,minor"),
            service_filter: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = adapter.into().to_lowercase();
        self
    }

    pub fn with_rule(mut self, kind: RuleKind, value: impl Into<String>) -> Self {
        self.rule = RuleConfig::new(kind, value);
        self
    }

    pub fn with_service_filter<I, S>(mut self, filter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.service_filter = filter
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn with_interval(mut self, seconds: u64) -> Self {
        self.interval_seconds = seconds;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// 轮询间隔，最少 1 秒
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }

    /// 请求超时
    pub fn timeout(&self) -> Duration {
        timeout_or_default(self.timeout_seconds)
    }
}

/// 非正数或无法表示为 Duration 的秒数使用默认超时
fn timeout_or_default(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS as u64))
}

/// Telegram 渠道配置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelegramConfig {
    pub enabled: bool,
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,
    pub chat_ids: Vec<String>,
    pub api_url: String,
    pub timestamp_format: String,
    /// `UTC` 或 `LOCAL`
    pub timestamp_zone: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            chat_ids: Vec::new(),
            api_url: "https://api.telegram.org".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S %Z".to_string(),
            timestamp_zone: "UTC".to_string(),
        }
    }
}

/// Webhook 渠道配置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub header_name: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            token: None,
            header_name: "Authorization".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationConfig {
    pub telegram: TelegramConfig,
    pub webhook: WebhookConfig,
    /// 持续告警的重复提醒间隔（分钟，最小 1）
    pub repeat_minutes: u64,
}

impl NotificationConfig {
    pub fn repeat_window(&self) -> Duration {
        Duration::from_secs(self.repeat_minutes.max(1).saturating_mul(60))
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            webhook: WebhookConfig::default(),
            repeat_minutes: DEFAULT_REPEAT_MINUTES,
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfig {
    pub modules: Vec<ModuleConfig>,
    pub defaults: DefaultConfig,
    pub log_level: String,
    pub log_format: LogFormat,
    pub notifications: NotificationConfig,
}

impl AppConfig {
    /// 从进程环境变量加载
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从进程环境变量加载，env 文件中的值作为兜底
    pub fn from_env_with_fallback(fallback: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| fallback.get(key).cloned()))
    }

    /// 从任意 key 查询函数加载
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = DefaultConfig {
            interval_seconds: env.u64_or(
                "SERVICE_MONITOR_DEFAULT_INTERVAL_SECONDS",
                DEFAULT_INTERVAL_SECONDS,
            ),
            timeout_seconds: env.f64_or(
                "SERVICE_MONITOR_DEFAULT_TIMEOUT_SECONDS",
                DEFAULT_TIMEOUT_SECONDS,
            ),
            user_agent: env.string_or("SERVICE_MONITOR_DEFAULT_USER_AGENT", DEFAULT_USER_AGENT),
        };

        let modules = module_slugs(&env)
            .into_iter()
            .map(|slug| load_module(&env, &slug, &defaults))
            .collect();

        let log_format = match env.get("SERVICE_MONITOR_LOG_FORMAT").as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            modules,
            defaults,
            log_level: env.string_or("SERVICE_MONITOR_LOG_LEVEL", "INFO").to_uppercase(),
            log_format,
            notifications: load_notifications(&env),
        }
    }

    /// 已启用的模块
    pub fn enabled_modules(&self) -> impl Iterator<Item = &ModuleConfig> {
        self.modules.iter().filter(|m| m.enabled)
    }

    pub fn module(&self, slug: &str) -> Option<&ModuleConfig> {
        let slug = slug.to_lowercase();
        self.modules.iter().find(|m| m.slug == slug)
    }
}

/// 各数据源的默认地址
pub fn default_url(slug: &str) -> String {
    match slug.to_lowercase().as_str() {
        "steam" => "https://steamstat.us/".to_string(),
        "openai" => "https://status.openai.com/api/v2/summary.json".to_string(),
        "claude" => "https://status.claude.com/api/v2/summary.json".to_string(),
        "cfx" => "https://status.cfx.re/api/v2/summary.json".to_string(),
        "oci" => "https://ocistatus.oraclecloud.com/api/v2/incident-summary.rss".to_string(),
        "aws" => "https://health.aws.amazon.com/public/currentevents".to_string(),
        "gcp" => "https://status.cloud.google.com/incidents.json".to_string(),
        other => format!("https://{}.example.com/", other),
    }
}

/// 拆分逗号分隔列表
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn module_slugs<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Vec<String> {
    match env.get("SERVICE_MONITOR_MODULES") {
        Some(raw) if !raw.trim().is_empty() => split_list(&raw)
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect(),
        _ => vec!["steam".to_string()],
    }
}

fn load_module<F: Fn(&str) -> Option<String>>(
    env: &Env<F>,
    slug: &str,
    defaults: &DefaultConfig,
) -> ModuleConfig {
    let prefix = slug.to_uppercase().replace('-', "_");
    let key = |suffix: &str| format!("{}_{}", prefix, suffix);

    ModuleConfig {
        slug: slug.to_string(),
        adapter: env.string_or(&key("ADAPTER"), slug).to_lowercase(),
        url: env.string_or(&key("URL"), &default_url(slug)),
        interval_seconds: env.u64_or(&key("INTERVAL_SECONDS"), defaults.interval_seconds),
        timeout_seconds: env.f64_or(&key("TIMEOUT_SECONDS"), defaults.timeout_seconds),
        user_agent: env.string_or(&key("USER_AGENT"), &defaults.user_agent),
        rule: RuleConfig::new(
            RuleKind::parse(&env.string_or(&key("RULE_KIND"), "status")),
            env.get(&key("RULE_VALUE")).unwrap_or_else(|| "major,minor".to_string()),
        ),
        service_filter: env
            .get(&key("SERVICE_FILTER"))
            .map(|raw| split_list(&raw).into_iter().map(|s| s.to_lowercase()).collect())
            .unwrap_or_default(),
        enabled: env.bool_or(&key("ENABLED"), true),
    }
}

fn load_notifications<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> NotificationConfig {
    let chat_ids = match env.get("TELEGRAM_CHAT_IDS").filter(|s| !s.trim().is_empty()) {
        Some(raw) => split_list(&raw),
        None => env
            .get("TELEGRAM_CHAT_ID")
            .filter(|s| !s.trim().is_empty())
            .into_iter()
            .collect(),
    };
    let telegram_defaults = TelegramConfig::default();
    let telegram = TelegramConfig {
        enabled: env.bool_or("TELEGRAM_ENABLED", false),
        bot_token: env.get("TELEGRAM_BOT_TOKEN").filter(|s| !s.is_empty()),
        chat_ids,
        api_url: env.string_or("TELEGRAM_API_URL", &telegram_defaults.api_url),
        timestamp_format: env.string_or(
            "TELEGRAM_TIMESTAMP_FORMAT",
            &telegram_defaults.timestamp_format,
        ),
        timestamp_zone: env.string_or("TELEGRAM_TIMESTAMP_ZONE", &telegram_defaults.timestamp_zone),
    };

    let webhook = WebhookConfig {
        enabled: env.bool_or("WEBHOOK_ENABLED", false),
        url: env.get("WEBHOOK_URL").filter(|s| !s.is_empty()),
        token: env.get("WEBHOOK_TOKEN").filter(|s| !s.is_empty()),
        header_name: env.string_or("WEBHOOK_HEADER_NAME", "Authorization"),
    };

    NotificationConfig {
        telegram,
        webhook,
        repeat_minutes: env.u64_or("NOTIFICATION_REPEAT_MINUTES", DEFAULT_REPEAT_MINUTES).max(1),
    }
}

/// 环境变量读取辅助
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn u64_or(&self, key: &str, default: u64) -> u64 {
        // 负数视为格式错误
        self.get(key)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(default)
    }

    fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|raw| raw.trim().to_lowercase()) {
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
            _ => default,
        }
    }
}

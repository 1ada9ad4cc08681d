//! Service Monitor CLI
//!
//! 轮询第三方状态页（云厂商、游戏平台、AI 服务），按规则判定并发送告警

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use service_monitor::config::{read_env_file, LogFormat};
use service_monitor::notification::{NotificationBuilder, NotificationDispatcher, NotificationEngine};
use service_monitor::source::build_http_client;
use service_monitor::{AppConfig, MonitorLoop, Scheduler, SourceRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "svcmon")]
#[command(about = "Service Monitor - 轮询服务状态页并发送告警通知")]
#[command(version)]
struct Cli {
    /// 额外加载的 env 文件（进程环境变量优先）
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动所有已配置模块的监控循环（默认）
    Run,
    /// 对单个模块执行一次检测并输出 JSON 判定（不发送通知）
    Check {
        /// 模块 slug，例如 steam、claude、aws
        slug: String,
    },
    /// 列出内置适配器与已配置的模块
    Sources {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.env_file {
        Some(path) => AppConfig::from_env_with_fallback(&read_env_file(path)?),
        None => AppConfig::from_env(),
    };

    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Check { slug } => check(config, &slug).await,
        Commands::Sources { json } => sources(&config, json),
    }
}

fn init_tracing(config: &AppConfig) {
    // RUST_LOG 优先，否则使用 SERVICE_MONITOR_LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.log_level)));

    match config.log_format {
        LogFormat::Json => fmt()
            .json()
            .with_writer(std::io::stdout)
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Text => fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init(),
    }
}

fn level_directive(level: &str) -> &'static str {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

async fn run(config: AppConfig) -> Result<()> {
    let client = build_http_client(&config.defaults)?;
    let engine = Arc::new(NotificationBuilder::new(config.notifications.clone(), client.clone()).build());
    let registry = SourceRegistry::with_builtin();

    let scheduler = match Scheduler::load(config.modules.clone(), &registry, client, engine.clone()) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!(event = "startup", error = %e, "No monitor modules loaded; exiting");
            return Err(e).context("Startup failed");
        }
    };

    info!(
        event = "startup",
        modules = ?scheduler.slugs(),
        default_interval_seconds = config.defaults.interval_seconds,
        default_timeout_seconds = config.defaults.timeout_seconds,
        channels = ?engine.channel_names(),
        "Service monitor started"
    );

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping monitor loops");
        signal_token.cancel();
    });

    scheduler.run(token).await;
    info!("Service monitor stopped");
    Ok(())
}

async fn check(config: AppConfig, slug: &str) -> Result<()> {
    let module = config
        .module(slug)
        .cloned()
        .with_context(|| format!("Module '{}' is not configured (see SERVICE_MONITOR_MODULES)", slug))?;

    let client = build_http_client(&config.defaults)?;
    let module = Arc::new(module);
    let source = SourceRegistry::with_builtin()
        .build(module.clone())
        .with_context(|| format!("Failed to load module '{}'", slug))?;

    // 单次检测不发送通知
    let engine = Arc::new(NotificationEngine::new(
        NotificationDispatcher::new(),
        config.notifications.repeat_window(),
    ));
    let verdict = MonitorLoop::new(source, module, client, engine).run_cycle().await;

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

fn sources(config: &AppConfig, json: bool) -> Result<()> {
    let registry = SourceRegistry::with_builtin();

    if json {
        let output = serde_json::json!({
            "adapters": registry.names(),
            "modules": config.modules,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Adapters: {}", registry.names().join(", "));
    println!();
    for module in &config.modules {
        let known = if registry.contains(&module.adapter) { "" } else { "  (unknown adapter)" };
        println!(
            "{:<10} {:<4} {:<10} every {:>4}s  rule={}:{}  {}{}",
            module.slug,
            if module.enabled { "on" } else { "off" },
            module.adapter,
            module.interval_seconds,
            module.rule.kind.as_str(),
            module.rule.value,
            module.url,
            known
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("debug"), "debug");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("nonsense"), "info");
    }

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::parse_from(["svcmon"]);
        assert!(cli.command.is_none());
        assert!(cli.env_file.is_none());
    }

    #[test]
    fn test_cli_check_with_env_file() {
        let cli = Cli::parse_from(["svcmon", "check", "steam", "--env-file", "/tmp/monitor.env"]);
        match cli.command {
            Some(Commands::Check { slug }) => assert_eq!(slug, "steam"),
            _ => panic!("expected check command"),
        }
        assert_eq!(cli.env_file, Some(PathBuf::from("/tmp/monitor.env")));
    }
}

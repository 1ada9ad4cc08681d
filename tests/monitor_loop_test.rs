//! 监控循环与调度器测试 - 使用暂停的 tokio 时钟

use async_trait::async_trait;
use service_monitor::notification::{NotificationDispatcher, NotificationEngine};
use service_monitor::source::{RawPayload, SourceLoadError};
use service_monitor::{
    CheckStatus, DataSource, FetchError, ModuleConfig, MonitorLoop, Scheduler, ServiceItem, Snapshot,
    SourceProfile, SourceRegistry, Verdict,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 总是失败的数据源
struct FailingSource {
    slug: String,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl DataSource for FailingSource {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile::components(&["major"], "no services found on page")
    }

    async fn fetch(&self, _client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Request("connection refused".to_string()))
    }
}

/// 每次拉取都通知测试的健康数据源
struct CountingSource {
    slug: String,
    fetched: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl DataSource for CountingSource {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile::components(&["major"], "no services found on page")
    }

    async fn fetch(&self, _client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        let _ = self.fetched.send(self.slug.clone());
        Ok(Snapshot::new(
            RawPayload::Text(String::new()),
            Ok(vec![ServiceItem::new("store", "Store", "good")]),
        ))
    }
}

/// 拉取时 panic 的数据源
struct PanickingSource;

#[async_trait]
impl DataSource for PanickingSource {
    fn slug(&self) -> &str {
        "panicky"
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile::incidents(&[])
    }

    async fn fetch(&self, _client: &reqwest::Client) -> Result<Snapshot, FetchError> {
        panic!("adapter bug");
    }
}

fn engine() -> Arc<NotificationEngine> {
    Arc::new(NotificationEngine::new(NotificationDispatcher::new(), Duration::from_secs(600)))
}

#[tokio::test(start_paused = true)]
async fn test_failing_fetch_keeps_polling() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(FailingSource { slug: "flaky".to_string(), fetches: fetches.clone() });
    let config = Arc::new(ModuleConfig::new("flaky", "https://flaky.example.com").with_interval(30));
    let (tx, mut rx) = mpsc::unbounded_channel::<Verdict>();

    let monitor = MonitorLoop::new(source, config, reqwest::Client::new(), engine()).with_verdict_sink(tx);
    let token = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(token.clone()));

    let started = Instant::now();
    for _ in 0..5 {
        let verdict = rx.recv().await.unwrap();
        assert_eq!(verdict.status, CheckStatus::Error);
        assert_eq!(verdict.message, "flaky status request failed");
        assert_eq!(verdict.reason.as_deref(), Some("request failed: connection refused"));
    }

    // 5 次失败之间固定间隔，无退避
    assert!(started.elapsed() >= Duration::from_secs(4 * 30));
    assert!(started.elapsed() < Duration::from_secs(5 * 30));
    assert!(fetches.load(Ordering::SeqCst) >= 5);
    assert!(!handle.is_finished());

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_is_clamped() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(FailingSource { slug: "fast".to_string(), fetches });
    let config = Arc::new(ModuleConfig::new("fast", "https://fast.example.com").with_interval(0));
    let (tx, mut rx) = mpsc::unbounded_channel::<Verdict>();

    let monitor = MonitorLoop::new(source, config, reqwest::Client::new(), engine()).with_verdict_sink(tx);
    let token = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(token.clone()));

    rx.recv().await.unwrap();
    let first = Instant::now();
    rx.recv().await.unwrap();
    assert!(first.elapsed() >= Duration::from_secs(1));

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_broken_source_does_not_block_others() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut registry = SourceRegistry::new();
    registry.register("broken", |config| {
        Err(SourceLoadError::Invalid {
            slug: config.slug.clone(),
            reason: "constructor failed".to_string(),
        })
    });
    registry.register("counting", move |config| {
        let source: Arc<dyn DataSource> = Arc::new(CountingSource {
            slug: config.slug.clone(),
            fetched: tx.clone(),
        });
        Ok(source)
    });

    let modules = vec![
        ModuleConfig::new("broken", "https://broken.example.com"),
        ModuleConfig::new("healthy", "https://healthy.example.com").with_adapter("counting"),
    ];
    let scheduler = Scheduler::load(modules, &registry, reqwest::Client::new(), engine()).unwrap();
    assert_eq!(scheduler.slugs(), vec!["healthy"]);

    let token = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(token.clone()));

    assert_eq!(rx.recv().await.unwrap(), "healthy");
    assert_eq!(rx.recv().await.unwrap(), "healthy");

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_panicking_loop_is_isolated() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = reqwest::Client::new();
    let engine = engine();

    let panicky = MonitorLoop::new(
        Arc::new(PanickingSource),
        Arc::new(ModuleConfig::new("panicky", "https://panicky.example.com")),
        client.clone(),
        engine.clone(),
    );
    let healthy = MonitorLoop::new(
        Arc::new(CountingSource { slug: "healthy".to_string(), fetched: tx }),
        Arc::new(ModuleConfig::new("healthy", "https://healthy.example.com").with_interval(5)),
        client,
        engine,
    );

    let scheduler = Scheduler::new(vec![panicky, healthy]).unwrap();
    let token = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(token.clone()));

    // panic 之后健康模块仍然按间隔继续轮询
    for _ in 0..3 {
        assert_eq!(rx.recv().await.unwrap(), "healthy");
    }
    assert!(!handle.is_finished());

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_fetch() {
    struct HangingSource;

    #[async_trait]
    impl DataSource for HangingSource {
        fn slug(&self) -> &str {
            "hanging"
        }

        fn profile(&self) -> SourceProfile {
            SourceProfile::incidents(&[])
        }

        async fn fetch(&self, _client: &reqwest::Client) -> Result<Snapshot, FetchError> {
            std::future::pending().await
        }
    }

    let config = Arc::new(ModuleConfig::new("hanging", "https://hanging.example.com").with_timeout(3600.0));
    let monitor = MonitorLoop::new(Arc::new(HangingSource), config, reqwest::Client::new(), engine());
    let token = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(token.clone()));

    tokio::time::sleep(Duration::from_secs(5)).await;
    token.cancel();
    handle.await.unwrap();
}

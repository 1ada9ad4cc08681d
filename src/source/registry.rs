//! 适配器注册表 - 按名称构造数据源
//!
//! 内置适配器在 `with_builtin` 中静态注册，外部适配器通过 `register` 追加。

use super::aws::AwsSource;
use super::gcp::GcpSource;
use super::oci::OciSource;
use super::statuspage::StatuspageSource;
use super::steam::SteamSource;
use super::DataSource;
use crate::config::ModuleConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// 数据源构造失败
#[derive(Debug, Error)]
pub enum SourceLoadError {
    #[error("unknown adapter '{adapter}' for module '{slug}'")]
    UnknownAdapter { slug: String, adapter: String },

    #[error("module '{0}' has no URL configured")]
    MissingUrl(String),

    #[error("invalid configuration for module '{slug}': {reason}")]
    Invalid { slug: String, reason: String },
}

/// 数据源构造函数
pub type SourceFactory =
    Arc<dyn Fn(Arc<ModuleConfig>) -> Result<Arc<dyn DataSource>, SourceLoadError> + Send + Sync>;

pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl SourceRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// 包含所有内置适配器的注册表
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("steam", |config| shared(SteamSource::new(config)));
        for name in ["statuspage", "claude", "openai", "cfx"] {
            registry.register(name, |config| shared(StatuspageSource::new(config)));
        }
        registry.register("aws", |config| shared(AwsSource::new(config)));
        registry.register("gcp", |config| shared(GcpSource::new(config)));
        registry.register("oci", |config| shared(OciSource::new(config)));
        registry
    }

    /// 注册（或替换）一个适配器
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(Arc<ModuleConfig>) -> Result<Arc<dyn DataSource>, SourceLoadError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_lowercase(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// 已注册的适配器名称（按字母序）
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// 根据模块配置构造数据源
    pub fn build(&self, config: Arc<ModuleConfig>) -> Result<Arc<dyn DataSource>, SourceLoadError> {
        if config.url.trim().is_empty() {
            return Err(SourceLoadError::MissingUrl(config.slug.clone()));
        }
        let factory = self
            .factories
            .get(&config.adapter.to_lowercase())
            .ok_or_else(|| SourceLoadError::UnknownAdapter {
                slug: config.slug.clone(),
                adapter: config.adapter.clone(),
            })?;
        factory(config)
    }
}

fn shared<S: DataSource + 'static>(source: S) -> Result<Arc<dyn DataSource>, SourceLoadError> {
    Ok(Arc::new(source))
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

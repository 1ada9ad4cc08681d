//! HTTP 拉取辅助

use super::FetchError;
use crate::config::{DefaultConfig, ModuleConfig};
use anyhow::{Context, Result};
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};
use std::time::Duration;

/// 创建所有数据源和通知渠道共享的 HTTP 客户端
pub fn build_http_client(defaults: &DefaultConfig) -> Result<Client> {
    Client::builder()
        .user_agent(defaults.user_agent.clone())
        .timeout(defaults.timeout())
        .build()
        .context("Failed to create HTTP client")
}

/// GET 模块地址；HTTP 状态码 >= 400 视为失败
pub async fn get(client: &Client, module: &ModuleConfig) -> Result<Response, FetchError> {
    let timeout = module.timeout();
    let response = client
        .get(&module.url)
        .timeout(timeout)
        .header(USER_AGENT, &module.user_agent)
        .send()
        .await
        .map_err(|e| map_send_error(e, timeout))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response)
}

pub async fn get_text(client: &Client, module: &ModuleConfig) -> Result<String, FetchError> {
    let timeout = module.timeout();
    get(client, module)
        .await?
        .text()
        .await
        .map_err(|e| map_send_error(e, timeout))
}

pub async fn get_json(client: &Client, module: &ModuleConfig) -> Result<serde_json::Value, FetchError> {
    let body = get_text(client, module).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::from(err)
    }
}

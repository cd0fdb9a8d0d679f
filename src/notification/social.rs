//! 社交媒体发布器
//!
//! 以 `{"text": ...}` JSON 调用状态发布接口，可选 Bearer 令牌认证

use crate::config::types::SocialConfig;
use crate::error::NotificationError;
use crate::notification::sender::{truncate_message, MessageKind, Publisher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// 社交媒体发布器
pub struct SocialPublisher {
    /// HTTP客户端
    client: Client,
    /// 发布接口地址
    url: Url,
    /// Bearer 令牌
    bearer_token: Option<String>,
}

impl SocialPublisher {
    /// 创建新的社交媒体发布器
    ///
    /// # 参数
    /// * `config` - 发布接口配置
    /// * `timeout` - 请求超时时间
    pub fn new(config: &SocialConfig, timeout: Duration) -> Result<Self, NotificationError> {
        let url = Url::parse(&config.url)
            .map_err(|e| NotificationError::ConfigError(format!("发布接口地址无效: {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            url,
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// 构建请求体，超长消息在此截断
    fn build_body(message: &str) -> Value {
        json!({ "text": truncate_message(message) })
    }
}

#[async_trait]
impl Publisher for SocialPublisher {
    fn name(&self) -> &str {
        "social"
    }

    async fn publish(&self, message: &str, _kind: MessageKind) -> Result<()> {
        debug!("发布消息到: {}", self.url);

        let mut request = self
            .client
            .post(self.url.clone())
            .json(&Self::build_body(message));
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("发布消息请求失败")?;

        if response.status().is_success() {
            info!("消息发布成功");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("消息发布失败: {} - {}", status, text);
            Err(anyhow::anyhow!("消息发布失败: {}", status))
        }
    }
}

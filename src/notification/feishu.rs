//! 飞书通知中继模块
//!
//! 通过飞书机器人webhook以交互卡片形式转发消息，支持签名校验

use crate::config::types::RelayConfig;
use crate::error::NotificationError;
use crate::notification::sender::{truncate_message, MessageKind, Publisher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

const CARD_TITLE: &str = "Algo Vitals";

/// 飞书通知发布器
pub struct FeishuPublisher {
    /// HTTP客户端
    client: Client,
    /// webhook URL
    webhook_url: String,
    /// 签名密钥
    secret: Option<String>,
}

impl FeishuPublisher {
    /// 创建新的飞书发布器
    ///
    /// # 参数
    /// * `config` - 中继配置
    /// * `timeout` - 请求超时时间
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 发布器实例
    pub fn new(config: &RelayConfig, timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            secret: config.secret.clone(),
        })
    }

    /// 计算签名
    ///
    /// 以 `timestamp + "\n" + secret` 为密钥对空消息做 HMAC-SHA256，再做 base64 编码。
    pub fn sign(timestamp: i64, secret: &str) -> Result<String, NotificationError> {
        let string_to_sign = format!("{timestamp}\n{secret}");
        let mac = HmacSha256::new_from_slice(string_to_sign.as_bytes())
            .map_err(|e| NotificationError::ConfigError(format!("签名密钥无效: {e}")))?;

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// 构建飞书消息体
    fn build_message_body(
        &self,
        message: &str,
        kind: MessageKind,
        timestamp: i64,
    ) -> Result<Value, NotificationError> {
        let color = match kind {
            MessageKind::Alert => "red",
            MessageKind::Digest => "green",
            MessageKind::Info => "blue",
        };

        let mut body = json!({
            "msg_type": "interactive",
            "card": {
                "elements": [
                    {
                        "tag": "div",
                        "text": {
                            "content": truncate_message(message),
                            "tag": "lark_md"
                        }
                    }
                ],
                "header": {
                    "title": {
                        "content": CARD_TITLE,
                        "tag": "plain_text"
                    },
                    "template": color
                }
            }
        });

        if let Some(secret) = &self.secret {
            body["timestamp"] = json!(timestamp.to_string());
            body["sign"] = json!(Self::sign(timestamp, secret)?);
        }

        Ok(body)
    }
}

#[async_trait]
impl Publisher for FeishuPublisher {
    fn name(&self) -> &str {
        "feishu"
    }

    async fn publish(&self, message: &str, kind: MessageKind) -> Result<()> {
        debug!("发送消息到飞书webhook: {}", self.webhook_url);

        let body = self.build_message_body(message, kind, chrono::Utc::now().timestamp())?;
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("发送飞书消息失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("飞书消息发送失败: {} - {}", status, text);
            return Err(anyhow::anyhow!("飞书消息发送失败: {}", status));
        }

        // 飞书在 HTTP 200 时通过 code 字段返回业务错误
        let reply: Value = response.json().await.unwrap_or(Value::Null);
        match reply.get("code").and_then(Value::as_i64) {
            Some(code) if code != 0 => {
                let msg = reply.get("msg").and_then(Value::as_str).unwrap_or_default();
                error!("飞书消息发送失败: code={} msg={}", code, msg);
                Err(anyhow::anyhow!("飞书消息发送失败: code={} msg={}", code, msg))
            }
            _ => {
                info!("飞书消息发送成功");
                Ok(())
            }
        }
    }
}

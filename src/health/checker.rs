//! HTTP存活探测器实现
//!
//! 对单个端点发起一次有超时限制的GET请求，把任何失败都归一为“宕机”观测

use crate::error::ConfigError;
use crate::health::endpoint::Endpoint;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 探测器trait，定义探测接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 探测一个端点
    ///
    /// # 参数
    /// * `endpoint` - 被探测的端点
    ///
    /// # 返回
    /// * `bool` - 本轮观测结果，`true` 表示在线。实现不得返回错误或panic。
    async fn probe(&self, endpoint: &Endpoint) -> bool;
}

/// 传输层失败类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum TransportFailure {
    /// 请求超时
    Timeout,
    /// 连接失败（拒绝连接、DNS解析失败等）
    Connect,
    /// 请求构建或发送失败
    Request,
    /// 重定向次数过多
    Redirect,
    /// 读取响应体失败
    Body,
    /// 响应解码失败
    Decode,
    /// 其他传输错误
    Other(String),
}

impl TransportFailure {
    /// 对 reqwest 错误进行分类
    pub fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else if error.is_redirect() {
            Self::Redirect
        } else if error.is_body() {
            Self::Body
        } else if error.is_decode() {
            Self::Decode
        } else if error.is_request() {
            Self::Request
        } else {
            Self::Other(error.to_string())
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Request timeout"),
            Self::Connect => write!(f, "Connection failed"),
            Self::Request => write!(f, "Invalid request"),
            Self::Redirect => write!(f, "Too many redirects"),
            Self::Body => write!(f, "Response body error"),
            Self::Decode => write!(f, "Response decode error"),
            Self::Other(detail) => write!(f, "Request failed: {detail}"),
        }
    }
}

/// 单次探测的详细结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ProbeOutcome {
    /// 返回了期望的状态码
    Up { status_code: u16, elapsed_ms: u64 },
    /// 返回了非期望的状态码
    BadStatus { status_code: u16, elapsed_ms: u64 },
    /// 没有收到响应
    Failed {
        failure: TransportFailure,
        elapsed_ms: u64,
    },
}

impl ProbeOutcome {
    /// 是否在线
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up { .. })
    }

    /// HTTP状态码（如果收到响应）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Up { status_code, .. } | Self::BadStatus { status_code, .. } => {
                Some(*status_code)
            }
            Self::Failed { .. } => None,
        }
    }

    /// 耗时（毫秒）
    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Self::Up { elapsed_ms, .. }
            | Self::BadStatus { elapsed_ms, .. }
            | Self::Failed { elapsed_ms, .. } => *elapsed_ms,
        }
    }

    /// 宕机原因描述
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Up { .. } => None,
            Self::BadStatus { status_code, .. } => Some(format!(
                "HTTP {} {}",
                status_code,
                reqwest::StatusCode::from_u16(*status_code)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown")
            )),
            Self::Failed { failure, .. } => Some(failure.to_string()),
        }
    }
}

/// HTTP探测器实现
///
/// 不做自动重试，超时由客户端统一限制，保证单轮检测不会无限挂起。
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `timeout` - 单次请求超时时间
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self { client })
    }

    /// 执行一次探测并返回详细结果
    pub async fn probe_detailed(&self, endpoint: &Endpoint) -> ProbeOutcome {
        let start_time = Instant::now();
        let response = self.client.get(endpoint.url().clone()).send().await;
        let elapsed_ms = start_time.elapsed().as_millis() as u64;

        match response {
            Ok(response) => {
                let status_code = response.status().as_u16();
                if endpoint.accepts_status(status_code) {
                    ProbeOutcome::Up {
                        status_code,
                        elapsed_ms,
                    }
                } else {
                    ProbeOutcome::BadStatus {
                        status_code,
                        elapsed_ms,
                    }
                }
            }
            Err(e) => ProbeOutcome::Failed {
                failure: TransportFailure::classify(&e),
                elapsed_ms,
            },
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &Endpoint) -> bool {
        let outcome = self.probe_detailed(endpoint).await;

        match outcome.reason() {
            None => info!("{} is up", endpoint.title()),
            Some(reason) => warn!("{} is down: {}", endpoint.title(), reason),
        }

        outcome.is_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober() -> HttpProber {
        HttpProber::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        let endpoint = Endpoint::new("Node", &format!("{}/health", server.url())).unwrap();
        let outcome = prober().probe_detailed(&endpoint).await;

        mock.assert_async().await;
        assert!(outcome.is_up());
        assert_eq!(outcome.status_code(), Some(200));
        assert!(outcome.reason().is_none());
        assert!(prober().probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_probe_bad_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(503)
            .create_async()
            .await;

        let endpoint = Endpoint::new("Node", &format!("{}/health", server.url())).unwrap();
        let outcome = prober().probe_detailed(&endpoint).await;

        assert!(!outcome.is_up());
        assert_eq!(outcome.status_code(), Some(503));
        assert!(outcome.reason().unwrap().contains("HTTP 503"));
        assert!(!prober().probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_non_200_success_is_down_by_default() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(204)
            .expect(2)
            .create_async()
            .await;

        let url = format!("{}/health", server.url());
        let strict = Endpoint::new("Strict", &url).unwrap();
        let lenient = Endpoint::with_status_codes("Lenient", &url, vec![200, 204]).unwrap();

        assert!(!prober().probe(&strict).await);
        assert!(prober().probe(&lenient).await);
    }

    #[tokio::test]
    async fn test_probe_connection_refused_never_errors() {
        // 端口 1 上通常没有监听者
        let endpoint = Endpoint::new("Closed", "http://127.0.0.1:1/health").unwrap();
        let outcome = prober().probe_detailed(&endpoint).await;

        assert!(matches!(outcome, ProbeOutcome::Failed { .. }));
        assert_eq!(outcome.status_code(), None);
        assert_eq!(outcome.reason().as_deref(), Some("Connection failed"));
        assert!(!prober().probe(&endpoint).await);
    }

    #[test]
    fn test_connect_failure_display_is_neutral() {
        // 同时覆盖拒绝连接与DNS解析失败
        assert_eq!(TransportFailure::Connect.to_string(), "Connection failed");
        assert_eq!(TransportFailure::Timeout.to_string(), "Request timeout");
    }

    #[tokio::test]
    async fn test_probe_unresolvable_host_never_errors() {
        let endpoint = Endpoint::new("Nowhere", "http://algo-vitals.invalid/health").unwrap();
        assert!(!prober().probe(&endpoint).await);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ProbeOutcome::Failed {
            failure: TransportFailure::Timeout,
            elapsed_ms: 10,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failure"]["kind"], "timeout");
    }
}

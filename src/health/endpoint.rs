//! 端点注册表
//!
//! 定义被检测的端点以及启动时构建的有序端点列表

use crate::config::types::{default_endpoints, EndpointConfig};
use crate::error::ConfigError;
use reqwest::Url;
use std::collections::HashSet;

/// 被检测的端点
///
/// 启动时创建，运行期间不可变。`title` 是聚合检测历史的键。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    title: String,
    url: Url,
    expected_status_codes: Vec<u16>,
}

impl Endpoint {
    /// 创建只接受 200 状态码的端点
    pub fn new(title: impl Into<String>, url: &str) -> Result<Self, ConfigError> {
        Self::with_status_codes(title, url, vec![200])
    }

    /// 创建自定义健康状态码的端点
    pub fn with_status_codes(
        title: impl Into<String>,
        url: &str,
        expected_status_codes: Vec<u16>,
    ) -> Result<Self, ConfigError> {
        let title = title.into();
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidEndpoint {
            title: title.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint {
                title,
                reason: format!("不支持的协议: {}", url.scheme()),
            });
        }

        Ok(Self {
            title,
            url,
            expected_status_codes,
        })
    }

    /// 端点名称
    pub fn title(&self) -> &str {
        &self.title
    }

    /// 健康检查URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// 状态码是否表示健康
    pub fn accepts_status(&self, status_code: u16) -> bool {
        self.expected_status_codes.contains(&status_code)
    }
}

impl TryFrom<&EndpointConfig> for Endpoint {
    type Error = ConfigError;

    fn try_from(config: &EndpointConfig) -> Result<Self, Self::Error> {
        Self::with_status_codes(
            config.title.clone(),
            &config.url,
            config.expected_status_codes.clone(),
        )
    }
}

/// 有序端点列表
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    /// 由端点列表构建注册表，名称重复时报错
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for endpoint in &endpoints {
            if !seen.insert(endpoint.title()) {
                return Err(ConfigError::ValidationError(format!(
                    "端点名称重复: {}",
                    endpoint.title()
                )));
            }
        }

        Ok(Self { endpoints })
    }

    /// 由配置构建注册表
    pub fn from_configs(configs: &[EndpointConfig]) -> Result<Self, ConfigError> {
        let endpoints = configs
            .iter()
            .map(Endpoint::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(endpoints)
    }

    /// 内置的 8 个端点
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_configs(&default_endpoints())
    }

    /// 按名称筛选出子集，保持原有顺序
    pub fn filter_by_title(&self, title: &str) -> Self {
        Self {
            endpoints: self
                .endpoints
                .iter()
                .filter(|e| e.title() == title)
                .cloned()
                .collect(),
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

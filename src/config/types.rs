//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::health::evaluator::DowntimePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 主配置结构，包含监控参数、端点列表、发布器和每日摘要配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 存活监控参数
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 端点列表（缺省时使用内置列表）
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
    /// 消息发布配置
    #[serde(default)]
    pub publisher: PublisherConfig,
    /// 每日摘要配置
    #[serde(default)]
    pub digest: DigestConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            endpoints: default_endpoints(),
            publisher: PublisherConfig::default(),
            digest: DigestConfig::default(),
        }
    }
}

impl Config {
    /// 将空字符串形式的可选项视为未配置
    ///
    /// 环境变量替换 `${VAR:-}` 会产生空字符串，这里统一归一化为 `None`。
    pub fn normalize(mut self) -> Self {
        self.monitor.alert_template = non_empty(self.monitor.alert_template);
        self.digest.explorer_api_key = non_empty(self.digest.explorer_api_key);
        self.digest.message_template = non_empty(self.digest.message_template);

        self.publisher.social = self.publisher.social.and_then(|mut social| {
            social.bearer_token = non_empty(social.bearer_token);
            if social.url.trim().is_empty() {
                None
            } else {
                Some(social)
            }
        });
        self.publisher.relay = self.publisher.relay.and_then(|mut relay| {
            relay.secret = non_empty(relay.secret);
            if relay.webhook_url.trim().is_empty() {
                None
            } else {
                Some(relay)
            }
        });

        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 告警策略类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// 按失败比例判定
    #[default]
    Ratio,
    /// 按累计宕机分钟数判定
    Duration,
}

/// 存活监控参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// 一次运行的总时长（秒）
    #[serde(default = "default_total_duration")]
    pub total_duration_seconds: u64,
    /// 两轮检测之间的间隔（秒）
    #[serde(default = "default_tick_delay")]
    pub tick_delay_seconds: u64,
    /// 单次探测请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// 告警策略
    #[serde(default)]
    pub policy: PolicyKind,
    /// 比例策略的告警阈值（百分比，严格大于时告警）
    #[serde(default = "default_ratio_threshold")]
    pub ratio_threshold_percent: f64,
    /// 自定义告警消息模板（handlebars）
    pub alert_template: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            total_duration_seconds: default_total_duration(),
            tick_delay_seconds: default_tick_delay(),
            request_timeout_seconds: default_timeout(),
            policy: PolicyKind::default(),
            ratio_threshold_percent: default_ratio_threshold(),
            alert_template: None,
        }
    }
}

impl MonitorConfig {
    /// 根据配置得到本次运行使用的告警策略
    pub fn downtime_policy(&self) -> DowntimePolicy {
        match self.policy {
            PolicyKind::Ratio => DowntimePolicy::Ratio {
                threshold_percent: self.ratio_threshold_percent,
            },
            PolicyKind::Duration => DowntimePolicy::Duration,
        }
    }
}

/// 端点配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    /// 端点名称（聚合键，必须唯一）
    pub title: String,
    /// 健康检查URL
    pub url: String,
    /// 视为健康的状态码
    #[serde(default = "default_expected_status_codes")]
    pub expected_status_codes: Vec<u16>,
}

impl EndpointConfig {
    /// 创建只接受 200 的端点配置
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            expected_status_codes: default_expected_status_codes(),
        }
    }
}

/// 消息发布配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PublisherConfig {
    /// 只在控制台输出，不调用任何外部接口
    #[serde(default)]
    pub dry_run: bool,
    /// 社交媒体发布接口
    pub social: Option<SocialConfig>,
    /// 通知中继（飞书机器人）
    pub relay: Option<RelayConfig>,
}

/// 社交媒体发布接口配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialConfig {
    /// 发布接口地址
    pub url: String,
    /// Bearer 令牌
    pub bearer_token: Option<String>,
}

/// 飞书通知中继配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// 飞书webhook URL
    pub webhook_url: String,
    /// 签名校验密钥
    pub secret: Option<String>,
}

/// 每日摘要配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigestConfig {
    /// 区块浏览器 GraphQL 地址
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    /// 区块浏览器 API Key
    pub explorer_api_key: Option<String>,
    /// 账户索引器地址
    #[serde(default = "default_indexer_url")]
    pub indexer_url: String,
    /// 域名解析服务地址
    #[serde(default = "default_name_service_url")]
    pub name_service_url: String,
    /// 单次查询的出块地址数量上限
    #[serde(default = "default_proposer_limit")]
    pub proposer_limit: u32,
    /// 上游请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// 自定义摘要消息模板（handlebars）
    pub message_template: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            explorer_url: default_explorer_url(),
            explorer_api_key: None,
            indexer_url: default_indexer_url(),
            name_service_url: default_name_service_url(),
            proposer_limit: default_proposer_limit(),
            request_timeout_seconds: default_timeout(),
            message_template: None,
        }
    }
}

// 默认值函数
fn default_total_duration() -> u64 {
    300
}
fn default_tick_delay() -> u64 {
    5
}
fn default_timeout() -> u64 {
    10
}
fn default_ratio_threshold() -> f64 {
    50.0
}
fn default_expected_status_codes() -> Vec<u16> {
    vec![200]
}
fn default_explorer_url() -> String {
    "https://graphql.bitquery.io".to_string()
}
fn default_indexer_url() -> String {
    "https://mainnet-idx.algonode.cloud".to_string()
}
fn default_name_service_url() -> String {
    "https://api.nf.domains".to_string()
}
fn default_proposer_limit() -> u32 {
    1000
}

/// 内置的端点列表：两个服务商、两个网络的节点与索引器
pub fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::new(
            "AlgoExplorer.io Indexer (MainNet)",
            "https://algoindexer.algoexplorerapi.io/health",
        ),
        EndpointConfig::new(
            "AlgoExplorer.io Node (MainNet)",
            "https://node.algoexplorerapi.io/health",
        ),
        EndpointConfig::new(
            "AlgoExplorer.io Node (TestNet)",
            "https://node.testnet.algoexplorerapi.io/health",
        ),
        EndpointConfig::new(
            "AlgoExplorer.io Indexer (TestNet)",
            "https://algoindexer.testnet.algoexplorerapi.io/health",
        ),
        EndpointConfig::new(
            "AlgoNode.io Indexer (TestNet)",
            "https://testnet-idx.algonode.cloud/health",
        ),
        EndpointConfig::new(
            "AlgoNode.io Indexer (MainNet)",
            "https://mainnet-idx.algonode.cloud/health",
        ),
        EndpointConfig::new(
            "AlgoNode.io Node (TestNet)",
            "https://testnet-api.algonode.cloud/health",
        ),
        EndpointConfig::new(
            "AlgoNode.io Node (MainNet)",
            "https://mainnet-api.algonode.cloud/health",
        ),
    ]
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证监控参数
    if config.monitor.tick_delay_seconds == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if config.monitor.request_timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    let threshold = config.monitor.ratio_threshold_percent;
    if !(0.0..100.0).contains(&threshold) {
        return Err(format!("告警阈值 {threshold} 必须位于 [0, 100) 区间"));
    }

    // 验证端点配置
    if config.endpoints.is_empty() {
        return Err("至少需要配置一个端点".to_string());
    }

    let mut titles = HashSet::new();
    for endpoint in &config.endpoints {
        if endpoint.title.trim().is_empty() {
            return Err("端点名称不能为空".to_string());
        }

        if !titles.insert(endpoint.title.as_str()) {
            return Err(format!("端点名称重复: {}", endpoint.title));
        }

        if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
            return Err(format!("端点 {} 的URL格式无效", endpoint.title));
        }

        if endpoint.expected_status_codes.is_empty() {
            return Err(format!("端点 {} 必须指定期望的状态码", endpoint.title));
        }

        for &code in &endpoint.expected_status_codes {
            if !(100..=599).contains(&code) {
                return Err(format!("端点 {} 的状态码 {} 无效", endpoint.title, code));
            }
        }
    }

    // 验证摘要配置
    if config.digest.proposer_limit == 0 {
        return Err("出块地址查询数量不能为0".to_string());
    }

    Ok(())
}

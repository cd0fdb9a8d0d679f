//! Algo Vitals - Algorand 端点存活监控与每日出块摘要
//!
//! 这是一个用Rust编写的命令行工具，支持：
//! - 固定时长的端点存活监控与宕机告警
//! - 社交媒体与飞书中继消息发布
//! - 每日出块摘要（区块浏览器 + 账户索引器）
//! - 结构化日志记录

pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;

// 重新导出主要类型
pub use config::{Config, EndpointConfig, MonitorConfig};
pub use error::AlgoVitalsError;
pub use health::{DowntimeEvaluator, DowntimePolicy, EndpointRegistry, LivenessMonitor};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

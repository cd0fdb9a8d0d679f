//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::types::PolicyKind;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Algo Vitals - Algorand 端点存活监控与每日出块摘要
#[derive(Parser, Debug, Clone)]
#[command(
    name = "algo-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "配置文件路径",
        env = "ALGO_VITALS_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "ALGO_VITALS_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 以JSON格式输出日志
    #[arg(long, global = true, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// 日志文件路径
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "日志文件路径（默认输出到标准错误）",
        env = "ALGO_VITALS_LOG_FILE"
    )]
    pub log_file: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// 告警策略
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum PolicyArg {
    /// 宕机比例超过阈值时告警
    Ratio,
    /// 出现任何整分钟的宕机即告警
    Duration,
}

impl From<PolicyArg> for PolicyKind {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Ratio => PolicyKind::Ratio,
            PolicyArg::Duration => PolicyKind::Duration,
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 执行一次存活监控运行，结束后发布告警
    Monitor {
        /// 运行总时长（秒）
        #[arg(
            long,
            value_name = "SECONDS",
            help = "运行总时长（秒）",
            env = "ALGO_VITALS_DURATION"
        )]
        duration: Option<u64>,

        /// 检测间隔（秒）
        #[arg(
            long,
            value_name = "SECONDS",
            help = "检测间隔（秒）",
            env = "ALGO_VITALS_TICK_DELAY"
        )]
        delay: Option<u64>,

        /// 告警策略
        #[arg(long, value_enum, help = "告警策略")]
        policy: Option<PolicyArg>,

        /// 只输出到控制台
        #[arg(long, help = "演练模式，告警只输出到控制台")]
        dry_run: bool,
    },

    /// 生成并发布每日出块摘要
    Digest {
        /// 报告日期（默认昨天，UTC）
        #[arg(long, value_name = "YYYY-MM-DD", help = "报告日期（默认昨天，UTC）")]
        date: Option<NaiveDate>,

        /// 只输出到控制台
        #[arg(long, help = "演练模式，摘要只输出到控制台")]
        dry_run: bool,
    },

    /// 对端点执行一次性探测
    Check {
        /// 端点名称（可选，不指定则检测所有端点）
        #[arg(value_name = "ENDPOINT", help = "端点名称")]
        endpoint: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,

        /// 超时时间（秒）
        #[arg(short, long, value_name = "SECONDS", help = "超时时间（秒）")]
        timeout: Option<u64>,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = crate::config::loader::CONFIG_FILE_NAME
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 通过已配置的接收端发布一条测试消息
    TestPublish {
        /// 测试消息内容
        #[arg(
            short,
            long,
            default_value = "🧪 algo-vitals test message",
            help = "测试消息内容"
        )]
        message: String,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
    /// 表格格式
    Table,
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::loader::get_default_config_path)
    }
}

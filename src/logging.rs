//! 日志系统模块
//!
//! 基于 tracing 的结构化日志：全局只初始化一次，支持JSON输出、文件输出、
//! 模块级别过滤，并通过 tracing-log 接收 `log` 宏产生的记录。
//! 日志写到标准错误，标准输出留给命令的结果输出。

use crate::health::evaluator::Alert;
use crate::health::result::RunReport;
use log::LevelFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

fn global_state() -> MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（设置后写入文件而不是标准错误）
    pub file_path: Option<PathBuf>,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

/// 请求链路上输出量较大的依赖库
const NOISY_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls"];

impl LogConfig {
    /// 把HTTP依赖库的日志级别限制在 warn 以内，已显式设置的模块不受影响
    pub fn with_quiet_dependencies(mut self) -> Self {
        let level = self.level.min(LevelFilter::Warn);
        for module in NOISY_DEPENDENCIES {
            self.module_levels
                .entry((*module).to_string())
                .or_insert(level);
        }
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }
}

/// 日志系统管理器
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用不会重复安装全局订阅者。
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `Result<LoggingSystem, anyhow::Error>` - 初始化结果
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        {
            let state = global_state();
            if state.initialized && !force_reinit {
                return match &state.init_error {
                    None => Ok(Self { config }),
                    Some(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
                };
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = global_state();
            state.initialized = true;
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result?;
        Ok(Self { config })
    }

    /// 当前实例使用的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)
    }

    /// 初始化 LogTracer（log → tracing 桥接），进程内只执行一次
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        LOG_TRACER_INIT
            .get_or_init(|| LogTracer::init().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 构建过滤器：RUST_LOG 优先，其次是配置的全局级别和模块级别
    fn build_filter(config: &LogConfig) -> EnvFilter {
        let mut env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, Self::level_to_string(*level)).parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => eprintln!("忽略无效的模块日志级别 {module}: {e}"),
            }
        }

        env_filter
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = Self::build_filter(config);

        let result = if let Some(file_path) = &config.file_path {
            let file = std::fs::File::create(file_path)
                .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
            let file_layer = if config.json_format {
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .boxed()
            };
            registry().with(env_filter).with(file_layer).try_init()
        } else {
            let console_layer = if config.json_format {
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_target(false)
                    .boxed()
            };
            registry().with(env_filter).with(console_layer).try_init()
        };

        match result {
            Ok(()) => {
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("already been set")
                    || error_msg.contains("already initialized")
                {
                    // 全局订阅者已经存在（例如测试中多次初始化）
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        let level = match level {
            LevelFilter::Off => TracingLevel::OFF,
            LevelFilter::Error => TracingLevel::ERROR,
            LevelFilter::Warn => TracingLevel::WARN,
            LevelFilter::Info => TracingLevel::INFO,
            LevelFilter::Debug => TracingLevel::DEBUG,
            LevelFilter::Trace => TracingLevel::TRACE,
        };
        Directive::from(level)
    }

    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        let mut state = global_state();
        state.initialized = false;
        state.init_error = None;
    }

    /// 记录一次监控运行的汇总
    pub fn run_summary_log(report: &RunReport, alerts: &[Alert]) {
        tracing::info!(
            run_id = %report.run_id,
            ticks = report.ticks,
            endpoints = report.histories.len(),
            endpoints_with_downtime = report.endpoints_with_downtime(),
            alerts = alerts.len(),
            "RUN: {} ticks, {} endpoints, {} alerts",
            report.ticks,
            report.histories.len(),
            alerts.len()
        );
    }

    /// 记录一条告警
    pub fn alert_log(alert: &Alert) {
        tracing::warn!(
            endpoint = %alert.title,
            down_checks = alert.assessment.down_checks,
            total_checks = alert.assessment.total_checks,
            down_minutes = alert.assessment.down_minutes,
            "{}",
            alert.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::evaluator::{DowntimeEvaluator, DowntimePolicy};
    use crate::health::result::History;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            ..LogConfig::default()
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        let first = LoggingSystem::setup_logging(config.clone());
        assert!(first.is_ok());
        assert!(global_state().initialized);

        // 第二次初始化直接复用全局状态
        let second = LoggingSystem::setup_logging(config);
        assert!(second.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        LoggingSystem::setup_logging(config.clone()).unwrap();
        assert!(global_state().initialized);

        let again = LoggingSystem::setup_logging_with_options(config, true);
        assert!(again.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let config = LogConfig {
            file_path: Some(temp_file.path().to_path_buf()),
            ..create_test_config()
        };

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_format() {
        LoggingSystem::reset_for_testing();

        let config = LogConfig {
            json_format: true,
            ..create_test_config()
        };

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_config_retrieval() {
        LoggingSystem::reset_for_testing();

        let config = LogConfig {
            level: LevelFilter::Debug,
            ..create_test_config()
        };
        let system = LoggingSystem::setup_logging(config.clone()).unwrap();

        assert_eq!(system.config(), &config);
    }

    #[test]
    fn test_quiet_dependencies_caps_http_crates() {
        let config = LogConfig {
            level: LevelFilter::Debug,
            ..LogConfig::default()
        }
        .with_quiet_dependencies();
        assert_eq!(config.module_levels["reqwest"], LevelFilter::Warn);
        assert_eq!(config.module_levels["hyper"], LevelFilter::Warn);

        // 全局级别更严格时依赖库跟随全局级别
        let quiet = LogConfig {
            level: LevelFilter::Error,
            ..LogConfig::default()
        }
        .with_quiet_dependencies();
        assert_eq!(quiet.module_levels["reqwest"], LevelFilter::Error);
    }

    #[test]
    fn test_quiet_dependencies_keeps_explicit_levels() {
        let mut config = create_test_config();
        config
            .module_levels
            .insert("reqwest".to_string(), LevelFilter::Trace);

        let config = config.with_quiet_dependencies();
        assert_eq!(config.module_levels["reqwest"], LevelFilter::Trace);
        assert_eq!(config.module_levels["h2"], LevelFilter::Warn);
    }

    #[test]
    #[serial]
    fn test_module_level_filtering() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config
            .module_levels
            .insert("reqwest".to_string(), LevelFilter::Warn);
        config
            .module_levels
            .insert("algo_vitals::health".to_string(), LevelFilter::Debug);

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_domain_log_helpers() {
        LoggingSystem::reset_for_testing();
        LoggingSystem::setup_logging(create_test_config()).unwrap();

        let mut report = RunReport::new(Duration::from_secs(5), ["Node"]);
        report.ticks = 2;
        *report.histories.get_mut("Node").unwrap() = History::from(vec![false, false]);

        let evaluator = DowntimeEvaluator::new(
            DowntimePolicy::Ratio {
                threshold_percent: 50.0,
            },
            Duration::from_secs(5),
        )
        .unwrap();
        let alerts = evaluator.evaluate_report(&report).unwrap();
        assert_eq!(alerts.len(), 1);

        LoggingSystem::alert_log(&alerts[0]);
        LoggingSystem::run_summary_log(&report, &alerts);
    }
}

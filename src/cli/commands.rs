//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::analytics::{DigestJob, DigestOutcome, ReportWindow};
use crate::cli::args::{Args, Commands, OutputFormat, PolicyArg};
use crate::config::{Config, ConfigLoader, TomlConfigLoader};
use crate::error::{NotificationError, Result};
use crate::health::{EndpointRegistry, HttpProber, LivenessMonitor, ProbeOutcome};
use crate::notification::{MessageKind, PublisherSet};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// `init` 命令写出的配置模板
const CONFIG_TEMPLATE: &str = include_str!("../../templates/algo-vitals.toml");

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载配置
///
/// 显式指定的配置文件必须存在；否则在默认位置查找，找不到时使用内置默认配置。
pub async fn load_config(args: &Args) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);
    match &args.config {
        Some(path) => loader.load_from_file(path).await,
        None => loader.load_or_default(args.get_config_path()).await,
    }
}

/// 把 `monitor` 子命令的覆盖参数应用到配置上，并重新验证
pub fn apply_monitor_overrides(
    mut config: Config,
    duration: Option<u64>,
    delay: Option<u64>,
    policy: Option<PolicyArg>,
    dry_run: bool,
) -> Result<Config> {
    if let Some(duration) = duration {
        config.monitor.total_duration_seconds = duration;
    }
    if let Some(delay) = delay {
        config.monitor.tick_delay_seconds = delay;
    }
    if let Some(policy) = policy {
        config.monitor.policy = policy.into();
    }
    if dry_run {
        config.publisher.dry_run = true;
    }

    TomlConfigLoader::new(false).validate(&config)?;
    Ok(config)
}

/// 监控命令
pub struct MonitorCommand;

#[async_trait]
impl Command for MonitorCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Monitor {
            duration,
            delay,
            policy,
            dry_run,
        } = &args.command
        {
            let config = load_config(args).await?;
            let config = apply_monitor_overrides(config, *duration, *delay, *policy, *dry_run)?;
            self.run_monitor(&config).await
        } else {
            Ok(())
        }
    }
}

impl MonitorCommand {
    async fn run_monitor(&self, config: &Config) -> Result<()> {
        let registry = EndpointRegistry::from_configs(&config.endpoints)?;
        let monitor = LivenessMonitor::from_config(config)?;

        info!(
            "开始监控 {} 个端点，时长 {} 秒，间隔 {} 秒",
            registry.len(),
            config.monitor.total_duration_seconds,
            config.monitor.tick_delay_seconds
        );

        let outcome = monitor.run(&registry).await?;

        info!(
            "监控结束：{} 条告警，发布成功 {} 次，失败 {} 次",
            outcome.alerts.len(),
            outcome.publish.delivered,
            outcome.publish.failed
        );
        Ok(())
    }
}

/// 每日摘要命令
pub struct DigestCommand;

#[async_trait]
impl Command for DigestCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Digest { date, dry_run } = &args.command {
            let mut config = load_config(args).await?;
            if *dry_run {
                config.publisher.dry_run = true;
            }
            self.run_digest(&config, *date).await
        } else {
            Ok(())
        }
    }
}

impl DigestCommand {
    async fn run_digest(&self, config: &Config, date: Option<NaiveDate>) -> Result<()> {
        let window = date
            .map(ReportWindow::for_day)
            .unwrap_or_else(ReportWindow::yesterday);

        let job = DigestJob::from_config(&config.digest)?;
        let publishers = PublisherSet::from_config(&config.publisher)?;

        match job.run(&window, &publishers).await? {
            DigestOutcome::NoActivity => {
                info!("{} 没有可汇总的出块数据，未发布消息", window.date());
            }
            DigestOutcome::Published { digest, summary, .. } => {
                info!(
                    "{} 摘要已发布：{} 个区块，{} 个出块地址，成功 {} 次，失败 {} 次",
                    digest.date,
                    digest.total_blocks,
                    digest.proposer_count,
                    summary.delivered,
                    summary.failed
                );
            }
        }

        Ok(())
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check {
            endpoint,
            format,
            timeout,
        } = &args.command
        {
            self.perform_check(args, endpoint.as_deref(), *format, *timeout)
                .await
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 对端点执行一次探测并输出结果
    async fn perform_check(
        &self,
        args: &Args,
        endpoint_title: Option<&str>,
        format: OutputFormat,
        timeout: Option<u64>,
    ) -> Result<()> {
        let config = load_config(args).await?;
        let registry = EndpointRegistry::from_configs(&config.endpoints)?;

        let registry = match endpoint_title {
            Some(title) => registry.filter_by_title(title),
            None => registry,
        };

        if registry.is_empty() {
            if let Some(title) = endpoint_title {
                eprintln!("未找到名为 '{title}' 的端点");
            } else {
                eprintln!("未配置任何端点");
            }
            return Ok(());
        }

        let timeout = timeout.unwrap_or(config.monitor.request_timeout_seconds);
        let prober = HttpProber::new(Duration::from_secs(timeout))?;

        let outcomes = futures::future::join_all(
            registry
                .endpoints()
                .iter()
                .map(|endpoint| prober.probe_detailed(endpoint)),
        )
        .await;

        let rows: Vec<(&str, &str, ProbeOutcome)> = registry
            .endpoints()
            .iter()
            .zip(outcomes)
            .map(|(endpoint, outcome)| (endpoint.title(), endpoint.url().as_str(), outcome))
            .collect();

        match format {
            OutputFormat::Json => {
                let json_rows: Vec<_> = rows
                    .iter()
                    .map(|(title, url, outcome)| {
                        serde_json::json!({
                            "title": title,
                            "url": url,
                            "outcome": outcome,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json_rows)?);
            }
            OutputFormat::Table => self.print_table_results(&rows),
            OutputFormat::Text => self.print_text_results(&rows),
        }

        Ok(())
    }

    /// 打印文本格式结果
    fn print_text_results(&self, rows: &[(&str, &str, ProbeOutcome)]) {
        for (title, url, outcome) in rows {
            let status_icon = if outcome.is_up() { "✓" } else { "✗" };
            println!(
                "{} {} ({}) - {}ms",
                status_icon,
                title,
                url,
                outcome.elapsed_ms()
            );

            if let Some(reason) = outcome.reason() {
                println!("  原因: {reason}");
            }
        }
    }

    /// 打印表格格式结果
    fn print_table_results(&self, rows: &[(&str, &str, ProbeOutcome)]) {
        println!(
            "{:<36} {:<6} {:<8} {:<10} {:<30}",
            "端点名称", "状态", "状态码", "响应时间", "原因"
        );
        println!("{}", "-".repeat(94));

        for (title, _, outcome) in rows {
            let status = if outcome.is_up() { "UP" } else { "DOWN" };
            let status_code = outcome
                .status_code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "N/A".to_string());

            println!(
                "{:<36} {:<6} {:<8} {:<10} {:<30}",
                title,
                status,
                status_code,
                format!("{}ms", outcome.elapsed_ms()),
                outcome.reason().unwrap_or_default()
            );
        }
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, CONFIG_TEMPLATE).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以配置端点和消息接收端");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!("监控参数:");
            println!("  运行时长: {}秒", config.monitor.total_duration_seconds);
            println!("  检测间隔: {}秒", config.monitor.tick_delay_seconds);
            println!("  请求超时: {}秒", config.monitor.request_timeout_seconds);
            println!("  告警策略: {:?}", config.monitor.downtime_policy());

            println!("端点配置:");
            for (i, endpoint) in config.endpoints.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, endpoint.title, endpoint.url);
                println!("     期望状态码: {:?}", endpoint.expected_status_codes);
            }

            println!("消息接收端:");
            println!("  演练模式: {}", if config.publisher.dry_run { "是" } else { "否" });
            println!(
                "  社交媒体: {}",
                if config.publisher.social.is_some() { "已配置" } else { "未配置" }
            );
            println!(
                "  飞书中继: {}",
                if config.publisher.relay.is_some() { "已配置" } else { "未配置" }
            );
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个端点配置", config.endpoints.len());
        }

        Ok(())
    }
}

/// 测试发布命令
pub struct TestPublishCommand;

#[async_trait]
impl Command for TestPublishCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::TestPublish { message } = &args.command {
            let config = load_config(args).await?;
            self.test_publish(&config, message).await
        } else {
            Ok(())
        }
    }
}

impl TestPublishCommand {
    async fn test_publish(&self, config: &Config, message: &str) -> Result<()> {
        let publishers = PublisherSet::from_config(&config.publisher)?;
        println!("📤 通过 {} 发送测试消息...", publishers.names().join(", "));

        let summary = publishers.publish(message, MessageKind::Info).await;
        if summary.is_success() {
            println!("✅ 测试消息发送成功（{} 个接收端）", summary.delivered);
            Ok(())
        } else {
            println!("❌ {} 个接收端发送失败，详情见日志", summary.failed);
            Err(NotificationError::SendError(format!(
                "{} 个接收端发送失败",
                summary.failed
            ))
            .into())
        }
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                _ => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

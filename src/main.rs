//! Algo Vitals 主程序入口
//!
//! Algorand 端点存活监控与每日出块摘要

use algo_vitals::cli::args::{Args, Commands};
use algo_vitals::cli::commands::{
    CheckCommand, Command, DigestCommand, InitCommand, MonitorCommand, TestPublishCommand,
    ValidateCommand, VersionCommand,
};
use algo_vitals::logging::{LogConfig, LoggingSystem};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.log_level.into(),
        file_path: args.log_file.clone(),
        json_format: args.json_logs,
        ..Default::default()
    }
    .with_quiet_dependencies();

    let _logging_system =
        LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!("Algo Vitals v{} 启动", algo_vitals::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Monitor { .. } => Box::new(MonitorCommand),
        Commands::Digest { .. } => Box::new(DigestCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::TestPublish { .. } => Box::new(TestPublishCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(anyhow::Error::from)
}

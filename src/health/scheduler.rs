//! 检测轮次调度器
//!
//! 在给定总时长内按固定间隔执行检测轮次，每轮对所有端点并行探测并汇总历史

use crate::config::types::MonitorConfig;
use crate::error::ConfigError;
use crate::health::checker::Prober;
use crate::health::endpoint::{Endpoint, EndpointRegistry};
use crate::health::result::RunReport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// 一次运行的时间参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSchedule {
    total_duration: Duration,
    tick_delay: Duration,
}

impl RunSchedule {
    /// 创建运行参数
    ///
    /// # 参数
    /// * `total_duration` - 总时长，为0时不执行任何轮次
    /// * `tick_delay` - 轮次间隔，必须大于0
    pub fn new(total_duration: Duration, tick_delay: Duration) -> Result<Self, ConfigError> {
        if tick_delay.is_zero() {
            return Err(ConfigError::ValidationError("检测间隔不能为0".to_string()));
        }

        Ok(Self {
            total_duration,
            tick_delay,
        })
    }

    /// 由监控配置创建运行参数
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        Self::new(
            Duration::from_secs(config.total_duration_seconds),
            Duration::from_secs(config.tick_delay_seconds),
        )
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    pub fn tick_delay(&self) -> Duration {
        self.tick_delay
    }

    /// 预期轮次数: ceil(total_duration / tick_delay)
    pub fn expected_ticks(&self) -> usize {
        let total = self.total_duration.as_nanos();
        let delay = self.tick_delay.as_nanos();
        total.div_ceil(delay) as usize
    }
}

/// 监控调度器
///
/// 轮次严格串行；轮内每个端点一个任务，全部完成后才写入历史。
/// 轮间休眠时长固定，不补偿探测耗时。
pub struct MonitorScheduler {
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 运行参数
    schedule: RunSchedule,
}

impl MonitorScheduler {
    /// 创建新的调度器
    pub fn new(prober: Arc<dyn Prober>, schedule: RunSchedule) -> Self {
        Self { prober, schedule }
    }

    pub fn schedule(&self) -> &RunSchedule {
        &self.schedule
    }

    /// 执行一次完整运行
    ///
    /// # 参数
    /// * `registry` - 端点注册表
    ///
    /// # 返回
    /// * `RunReport` - 每个端点的完整观测历史
    pub async fn run(&self, registry: &EndpointRegistry) -> RunReport {
        let endpoints = registry.endpoints();
        let tick_delay = self.schedule.tick_delay;
        let mut report = RunReport::new(tick_delay, endpoints.iter().map(Endpoint::title));
        let mut remaining = self.schedule.total_duration;

        info!(
            run_id = %report.run_id,
            endpoints = endpoints.len(),
            expected_ticks = self.schedule.expected_ticks(),
            "开始存活监控"
        );

        while !remaining.is_zero() {
            let observations = self.tick(endpoints).await;

            for (endpoint, up) in endpoints.iter().zip(observations) {
                report
                    .histories
                    .entry(endpoint.title().to_string())
                    .or_default()
                    .record(up);
            }
            report.ticks += 1;

            remaining = remaining.saturating_sub(tick_delay);
            if remaining.is_zero() {
                break;
            }

            info!(
                "Sleeping for {} seconds, total seconds left {}",
                tick_delay.as_secs(),
                remaining.as_secs()
            );
            tokio::time::sleep(tick_delay).await;
        }

        info!(run_id = %report.run_id, ticks = report.ticks, "存活监控结束");
        report
    }

    /// 执行一轮检测
    ///
    /// 返回值与 `endpoints` 一一对应，与完成顺序无关。
    async fn tick(&self, endpoints: &[Endpoint]) -> Vec<bool> {
        let handles: Vec<_> = endpoints
            .iter()
            .cloned()
            .map(|endpoint| {
                let prober = Arc::clone(&self.prober);
                tokio::spawn(async move { prober.probe(&endpoint).await })
            })
            .collect();

        let results = futures::future::join_all(handles).await;

        endpoints
            .iter()
            .zip(results)
            .map(|(endpoint, result)| match result {
                Ok(up) => {
                    debug!("{} 本轮结果: {}", endpoint.title(), up);
                    up
                }
                Err(e) => {
                    error!("探测任务异常终止 {}: {}", endpoint.title(), e);
                    false
                }
            })
            .collect()
    }
}

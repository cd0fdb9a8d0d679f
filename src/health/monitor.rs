//! 存活监控运行
//!
//! 把调度器、判定器和发布器集合组装为一次完整的监控运行：
//! 先跑完所有轮次，再统一判定，最后逐条发布告警。

use crate::config::types::Config;
use crate::error::{AlgoVitalsError, NotificationError};
use crate::health::checker::{HttpProber, Prober};
use crate::health::endpoint::EndpointRegistry;
use crate::health::evaluator::{Alert, DowntimeEvaluator};
use crate::health::result::RunReport;
use crate::health::scheduler::{MonitorScheduler, RunSchedule};
use crate::logging::LoggingSystem;
use crate::notification::sender::{MessageKind, PublishSummary, PublisherSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 一次监控运行的结果
#[derive(Debug)]
pub struct MonitorOutcome {
    /// 各端点的观测历史
    pub report: RunReport,
    /// 按端点名称排序的告警
    pub alerts: Vec<Alert>,
    /// 告警发布统计
    pub publish: PublishSummary,
}

/// 存活监控器
pub struct LivenessMonitor {
    scheduler: MonitorScheduler,
    evaluator: DowntimeEvaluator,
    publishers: PublisherSet,
}

impl LivenessMonitor {
    pub fn new(
        scheduler: MonitorScheduler,
        evaluator: DowntimeEvaluator,
        publishers: PublisherSet,
    ) -> Self {
        Self {
            scheduler,
            evaluator,
            publishers,
        }
    }

    /// 由配置组装监控器，使用HTTP探测器
    pub fn from_config(config: &Config) -> Result<Self, AlgoVitalsError> {
        let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(Duration::from_secs(
            config.monitor.request_timeout_seconds,
        ))?);
        let schedule = RunSchedule::from_config(&config.monitor)?;
        let evaluator = DowntimeEvaluator::from_config(&config.monitor)?;
        let publishers = PublisherSet::from_config(&config.publisher)?;

        Ok(Self::new(
            MonitorScheduler::new(prober, schedule),
            evaluator,
            publishers,
        ))
    }

    /// 执行一次完整运行
    ///
    /// 发布失败只记录日志并计入统计；只有模板渲染失败会返回错误。
    pub async fn run(
        &self,
        registry: &EndpointRegistry,
    ) -> Result<MonitorOutcome, NotificationError> {
        let report = self.scheduler.run(registry).await;
        let alerts = self.evaluator.evaluate_report(&report)?;

        let mut publish = PublishSummary::default();
        for alert in &alerts {
            LoggingSystem::alert_log(alert);
            publish.merge(self.publishers.publish(&alert.message, MessageKind::Alert).await);
        }

        if alerts.is_empty() {
            info!("所有端点运行正常，无需告警");
        }
        LoggingSystem::run_summary_log(&report, &alerts);

        Ok(MonitorOutcome {
            report,
            alerts,
            publish,
        })
    }
}

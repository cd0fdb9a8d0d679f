//! 宕机判定
//!
//! 运行结束后把每个端点的完整历史归约为宕机指标，并决定是否告警。
//! 每次运行只使用一种策略：
//! - 比例策略：宕机轮次占比严格大于阈值（默认50%）时告警，能容忍零星失败；
//! - 时长策略：宕机轮次 × 间隔换算为分钟（四舍六入五成双），大于0即告警。

use crate::config::types::MonitorConfig;
use crate::error::NotificationError;
use crate::health::result::{History, RunReport};
use crate::notification::template::{
    HandlebarsTemplate, MessageTemplate, DEFAULT_DURATION_ALERT_TEMPLATE,
    DEFAULT_RATIO_ALERT_TEMPLATE,
};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// 告警策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DowntimePolicy {
    /// 宕机比例（百分比）严格大于阈值时告警
    Ratio { threshold_percent: f64 },
    /// 累计宕机分钟数大于0时告警
    Duration,
}

impl DowntimePolicy {
    fn default_template(&self) -> &'static str {
        match self {
            Self::Ratio { .. } => DEFAULT_RATIO_ALERT_TEMPLATE,
            Self::Duration => DEFAULT_DURATION_ALERT_TEMPLATE,
        }
    }
}

/// 单个端点的宕机指标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DowntimeAssessment {
    /// 宕机轮次数
    pub down_checks: usize,
    /// 总轮次数
    pub total_checks: usize,
    /// 宕机比例（百分比）
    pub down_percent: f64,
    /// 累计宕机分钟数
    pub down_minutes: u64,
    /// 观测窗口分钟数
    pub window_minutes: u64,
    /// 是否需要告警
    pub alert: bool,
}

/// 告警
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    /// 端点名称
    pub title: String,
    /// 告警消息
    pub message: String,
    /// 宕机指标
    pub assessment: DowntimeAssessment,
}

/// 宕机比例（百分比），空历史视为0
pub fn down_percent(history: &History) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    history.down_count() as f64 / history.len() as f64 * 100.0
}

/// 比例策略判定
pub fn endpoint_is_down(history: &History, threshold_percent: f64) -> bool {
    !history.is_empty() && down_percent(history) > threshold_percent
}

/// 宕机轮次换算成的分钟数
pub fn downtime_minutes(history: &History, tick_delay: Duration) -> u64 {
    seconds_to_minutes(history.down_count() as f64 * tick_delay.as_secs_f64())
}

fn seconds_to_minutes(seconds: f64) -> u64 {
    (seconds / 60.0).round_ties_even() as u64
}

/// 宕机判定器
///
/// 对同一份历史重复判定总是得到相同的结果与消息。
#[derive(Debug, Clone)]
pub struct DowntimeEvaluator {
    policy: DowntimePolicy,
    tick_delay: Duration,
    template: HandlebarsTemplate,
}

impl DowntimeEvaluator {
    /// 使用策略默认模板创建判定器
    pub fn new(policy: DowntimePolicy, tick_delay: Duration) -> Result<Self, NotificationError> {
        let template = HandlebarsTemplate::new(policy.default_template())?;
        Ok(Self {
            policy,
            tick_delay,
            template,
        })
    }

    /// 由监控配置创建判定器
    pub fn from_config(config: &MonitorConfig) -> Result<Self, NotificationError> {
        let evaluator = Self::new(
            config.downtime_policy(),
            Duration::from_secs(config.tick_delay_seconds),
        )?;

        match config.alert_template.as_deref() {
            Some(template) => evaluator.with_template(template),
            None => Ok(evaluator),
        }
    }

    /// 替换告警消息模板
    pub fn with_template(mut self, template: &str) -> Result<Self, NotificationError> {
        let template = HandlebarsTemplate::new(template)?;
        let sample = Self::context("Sample Endpoint", &self.assess(&History::from(vec![false])));
        template.validate(&sample)?;

        self.template = template;
        Ok(self)
    }

    pub fn policy(&self) -> DowntimePolicy {
        self.policy
    }

    /// 按判定器自身的间隔计算宕机指标
    pub fn assess(&self, history: &History) -> DowntimeAssessment {
        self.assess_with_delay(history, self.tick_delay)
    }

    /// 按指定的轮次间隔计算宕机指标
    pub fn assess_with_delay(&self, history: &History, tick_delay: Duration) -> DowntimeAssessment {
        let down_minutes = downtime_minutes(history, tick_delay);
        let alert = match self.policy {
            DowntimePolicy::Ratio { threshold_percent } => {
                endpoint_is_down(history, threshold_percent)
            }
            DowntimePolicy::Duration => down_minutes > 0,
        };

        DowntimeAssessment {
            down_checks: history.down_count(),
            total_checks: history.len(),
            down_percent: down_percent(history),
            down_minutes,
            window_minutes: seconds_to_minutes(history.len() as f64 * tick_delay.as_secs_f64()),
            alert,
        }
    }

    /// 判定单个端点，需要告警时返回告警消息
    pub fn evaluate(
        &self,
        title: &str,
        history: &History,
    ) -> Result<Option<Alert>, NotificationError> {
        self.evaluate_with_delay(title, history, self.tick_delay)
    }

    fn evaluate_with_delay(
        &self,
        title: &str,
        history: &History,
        tick_delay: Duration,
    ) -> Result<Option<Alert>, NotificationError> {
        let assessment = self.assess_with_delay(history, tick_delay);
        if !assessment.alert {
            return Ok(None);
        }

        let message = self.template.render(&Self::context(title, &assessment))?;
        Ok(Some(Alert {
            title: title.to_string(),
            message,
            assessment,
        }))
    }

    /// 判定整次运行，告警按端点名称排序
    ///
    /// 分钟数按运行报告记录的轮次间隔换算，而不是判定器自身的间隔。
    pub fn evaluate_report(&self, report: &RunReport) -> Result<Vec<Alert>, NotificationError> {
        let mut alerts = Vec::new();
        for (title, history) in &report.histories {
            if let Some(alert) = self.evaluate_with_delay(title, history, report.tick_delay)? {
                alerts.push(alert);
            }
        }
        Ok(alerts)
    }

    fn context(title: &str, assessment: &DowntimeAssessment) -> serde_json::Value {
        json!({
            "title": title,
            "percent": format!("{:.0}", assessment.down_percent),
            "minutes": assessment.down_minutes,
            "down_checks": assessment.down_checks,
            "total_checks": assessment.total_checks,
            "window_minutes": assessment.window_minutes,
        })
    }
}

//! 检测历史数据结构
//!
//! 定义单个端点的观测历史与一次运行的汇总结果

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// 单个端点按轮次顺序记录的观测序列
///
/// `true` 表示该轮在线，`false` 表示宕机。最早的一轮排在最前。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct History {
    observations: Vec<bool>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一轮观测
    pub fn record(&mut self, up: bool) {
        self.observations.push(up);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// 宕机轮次数
    pub fn down_count(&self) -> usize {
        self.observations.iter().filter(|up| !**up).count()
    }

    /// 在线轮次数
    pub fn up_count(&self) -> usize {
        self.len() - self.down_count()
    }

    pub fn observations(&self) -> &[bool] {
        &self.observations
    }
}

impl From<Vec<bool>> for History {
    fn from(observations: Vec<bool>) -> Self {
        Self { observations }
    }
}

impl FromIterator<bool> for History {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            observations: iter.into_iter().collect(),
        }
    }
}

/// 一次监控运行的结果
///
/// 所有端点的历史长度都等于 `ticks`。按名称排序迭代，保证告警顺序稳定。
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// 运行ID
    pub run_id: Uuid,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 检测间隔
    #[serde(with = "duration_secs")]
    pub tick_delay: Duration,
    /// 已执行的轮次数
    pub ticks: usize,
    /// 各端点的观测历史
    pub histories: BTreeMap<String, History>,
}

impl RunReport {
    /// 为给定的端点名称创建空的运行结果
    pub fn new<'a>(tick_delay: Duration, titles: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            tick_delay,
            ticks: 0,
            histories: titles
                .into_iter()
                .map(|title| (title.to_string(), History::new()))
                .collect(),
        }
    }

    /// 获取某个端点的历史
    pub fn history(&self, title: &str) -> Option<&History> {
        self.histories.get(title)
    }

    /// 出现过宕机的端点数量
    pub fn endpoints_with_downtime(&self) -> usize {
        self.histories
            .values()
            .filter(|history| history.down_count() > 0)
            .count()
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }
}

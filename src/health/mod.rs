//! 存活监控模块
//!
//! 提供端点注册表、HTTP探测、历史汇总、轮次调度、宕机判定以及完整监控运行

pub mod checker;
pub mod endpoint;
pub mod evaluator;
pub mod monitor;
pub mod result;
pub mod scheduler;

// 重新导出主要类型
pub use checker::{HttpProber, ProbeOutcome, Prober, TransportFailure};
pub use endpoint::{Endpoint, EndpointRegistry};
pub use evaluator::{Alert, DowntimeAssessment, DowntimeEvaluator, DowntimePolicy};
pub use monitor::{LivenessMonitor, MonitorOutcome};
pub use result::{History, RunReport};
pub use scheduler::{MonitorScheduler, RunSchedule};

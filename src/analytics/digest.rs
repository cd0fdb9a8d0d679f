//! 每日出块摘要任务
//!
//! 顺序执行、无重试、不保存状态：
//! 1. 查询前一天（UTC）按出块地址分组的区块数和交易数；
//! 2. 查询每个出块地址的余额；
//! 3. 解析出块最多地址的域名；
//! 4. 汇总、渲染消息并交给发布器集合。

use crate::analytics::explorer::{BitqueryExplorer, BlockExplorer};
use crate::analytics::format::{pretty_date, pretty_value};
use crate::analytics::indexer::{AccountIndexer, HttpIndexer, NameResolver, NfdResolver};
use crate::config::types::DigestConfig;
use crate::error::{AlgoVitalsError, DigestError, NotificationError};
use crate::notification::sender::{MessageKind, PublishSummary, PublisherSet};
use crate::notification::template::{
    HandlebarsTemplate, MessageTemplate, DEFAULT_DIGEST_TEMPLATE,
};
use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 报告窗口：某个 UTC 自然日
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    date: NaiveDate,
}

impl ReportWindow {
    pub fn for_day(date: NaiveDate) -> Self {
        Self { date }
    }

    /// `today` 的前一天
    pub fn previous_day(today: NaiveDate) -> Self {
        Self::for_day(today.checked_sub_days(Days::new(1)).unwrap_or(today))
    }

    /// 当前 UTC 日期的前一天
    pub fn yesterday() -> Self {
        Self::previous_day(Utc::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// 窗口起点，形如 `2023-10-16`
    pub fn start(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// 窗口终点，形如 `2023-10-16T23:59:59`
    pub fn end(&self) -> String {
        format!("{}T23:59:59", self.start())
    }
}

/// 出块摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposerDigest {
    /// 报告日期
    pub date: NaiveDate,
    /// 区块总数
    pub total_blocks: u64,
    /// 交易总数
    pub total_transactions: f64,
    /// 出块最多的地址
    pub biggest_proposer: String,
    /// 出块最多地址的展示名称
    pub biggest_proposer_name: String,
    /// 出块地址数量
    pub proposer_count: usize,
    /// 余额平均值（microAlgos）
    pub average_balance: f64,
    /// 余额最小值（microAlgos）
    pub min_balance: u64,
    /// 余额最大值（microAlgos）
    pub max_balance: u64,
}

impl ProposerDigest {
    /// 模板上下文，数值已格式化
    pub fn context(&self) -> serde_json::Value {
        json!({
            "date": pretty_date(self.date),
            "total_blocks": self.total_blocks,
            "total_transactions": pretty_value(self.total_transactions, false),
            "biggest_proposer": self.biggest_proposer_name,
            "biggest_proposer_address": self.biggest_proposer,
            "proposer_count": self.proposer_count,
            "average_balance": pretty_value(self.average_balance, true),
            "min_balance": pretty_value(self.min_balance as f64, true),
            "max_balance": pretty_value(self.max_balance as f64, true),
        })
    }
}

/// 摘要任务结果
#[derive(Debug, Clone, PartialEq)]
pub enum DigestOutcome {
    /// 窗口内没有区块或交易，未发布任何消息
    NoActivity,
    /// 已生成并分发
    Published {
        digest: ProposerDigest,
        message: String,
        summary: PublishSummary,
    },
}

/// 每日摘要任务
pub struct DigestJob {
    explorer: Arc<dyn BlockExplorer>,
    indexer: Arc<dyn AccountIndexer>,
    names: Arc<dyn NameResolver>,
    template: HandlebarsTemplate,
}

impl DigestJob {
    /// 使用默认消息模板创建任务
    pub fn new(
        explorer: Arc<dyn BlockExplorer>,
        indexer: Arc<dyn AccountIndexer>,
        names: Arc<dyn NameResolver>,
    ) -> Result<Self, NotificationError> {
        Ok(Self {
            explorer,
            indexer,
            names,
            template: HandlebarsTemplate::new(DEFAULT_DIGEST_TEMPLATE)?,
        })
    }

    /// 由配置创建任务
    pub fn from_config(config: &DigestConfig) -> Result<Self, AlgoVitalsError> {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let explorer = BitqueryExplorer::new(
            config.explorer_url.clone(),
            config.explorer_api_key.clone(),
            config.proposer_limit,
            timeout,
        )?;
        let indexer = HttpIndexer::new(&config.indexer_url, timeout)?;
        let names = NfdResolver::new(&config.name_service_url, timeout)?;

        let job = Self::new(Arc::new(explorer), Arc::new(indexer), Arc::new(names))?;
        match config.message_template.as_deref() {
            Some(template) => Ok(job.with_template(template)?),
            None => Ok(job),
        }
    }

    /// 替换消息模板
    pub fn with_template(mut self, template: &str) -> Result<Self, NotificationError> {
        let template = HandlebarsTemplate::new(template)?;
        let sample = ProposerDigest {
            date: NaiveDate::MIN,
            total_blocks: 0,
            total_transactions: 0.0,
            biggest_proposer: String::new(),
            biggest_proposer_name: String::new(),
            proposer_count: 0,
            average_balance: 0.0,
            min_balance: 0,
            max_balance: 0,
        };
        template.validate(&sample.context())?;

        self.template = template;
        Ok(self)
    }

    /// 汇总窗口内的出块数据
    ///
    /// 没有区块或交易时返回 `None`。任一余额查询失败则整个任务失败。
    pub async fn compile(
        &self,
        window: &ReportWindow,
    ) -> Result<Option<ProposerDigest>, DigestError> {
        let activity = self.explorer.daily_activity(window).await?;
        if activity.blocks.is_empty() || activity.transactions.is_empty() {
            info!("No blocks found for this date range");
            return Ok(None);
        }

        let biggest_proposer = activity.blocks[0].address.clone();

        let mut blocks_by_proposer: HashMap<&str, u64> = HashMap::new();
        let mut balances = Vec::new();
        for row in &activity.blocks {
            if !blocks_by_proposer.contains_key(row.address.as_str()) {
                balances.push(self.indexer.balance(&row.address).await?);
            }
            *blocks_by_proposer.entry(row.address.as_str()).or_insert(0) += row.count;
        }

        let total_blocks: u64 = blocks_by_proposer.values().sum();
        let min_balance = balances.iter().copied().min().unwrap_or_default();
        let max_balance = balances.iter().copied().max().unwrap_or_default();
        let average_balance =
            balances.iter().map(|b| *b as f64).sum::<f64>() / balances.len() as f64;

        let biggest_proposer_name = self.names.display_name(&biggest_proposer).await;

        Ok(Some(ProposerDigest {
            date: window.date(),
            total_blocks,
            total_transactions: activity.transactions[0].count,
            biggest_proposer,
            biggest_proposer_name,
            proposer_count: balances.len(),
            average_balance,
            min_balance,
            max_balance,
        }))
    }

    /// 渲染摘要消息
    pub fn render(&self, digest: &ProposerDigest) -> Result<String, NotificationError> {
        self.template.render(&digest.context())
    }

    /// 执行一次完整的摘要任务
    pub async fn run(
        &self,
        window: &ReportWindow,
        publishers: &PublisherSet,
    ) -> Result<DigestOutcome, AlgoVitalsError> {
        info!("生成 {} 的出块摘要", window.start());

        let Some(digest) = self.compile(window).await? else {
            return Ok(DigestOutcome::NoActivity);
        };

        let message = self.render(&digest)?;
        info!("{}", message);
        let summary = publishers.publish(&message, MessageKind::Digest).await;

        Ok(DigestOutcome::Published {
            digest,
            message,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::explorer::{DailyActivity, ProposerBlocks, TransactionDay};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedExplorer(DailyActivity);

    #[async_trait]
    impl BlockExplorer for FixedExplorer {
        async fn daily_activity(&self, _: &ReportWindow) -> Result<DailyActivity, DigestError> {
            Ok(self.0.clone())
        }
    }

    struct FixedIndexer {
        balances: HashMap<String, u64>,
        queried: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AccountIndexer for FixedIndexer {
        async fn balance(&self, address: &str) -> Result<u64, DigestError> {
            self.queried.lock().unwrap().push(address.to_string());
            self.balances
                .get(address)
                .copied()
                .ok_or(DigestError::UpstreamStatus {
                    service: "indexer".to_string(),
                    status: 404,
                })
        }
    }

    struct FixedNames;

    #[async_trait]
    impl NameResolver for FixedNames {
        async fn display_name(&self, address: &str) -> String {
            format!("{}.algo", address.to_lowercase())
        }
    }

    fn block(address: &str, count: u64) -> ProposerBlocks {
        ProposerBlocks {
            address: address.to_string(),
            annotation: None,
            count,
        }
    }

    fn activity(blocks: Vec<ProposerBlocks>, transactions: f64) -> DailyActivity {
        DailyActivity {
            blocks,
            transactions: vec![TransactionDay {
                date: Some("2023-10-16".to_string()),
                count: transactions,
                fee: None,
            }],
        }
    }

    fn job(activity: DailyActivity, balances: &[(&str, u64)]) -> (DigestJob, Arc<FixedIndexer>) {
        let indexer = Arc::new(FixedIndexer {
            balances: balances.iter().map(|(a, b)| (a.to_string(), *b)).collect(),
            queried: Mutex::new(Vec::new()),
        });
        let job = DigestJob::new(
            Arc::new(FixedExplorer(activity)),
            indexer.clone(),
            Arc::new(FixedNames),
        )
        .unwrap();
        (job, indexer)
    }

    fn window() -> ReportWindow {
        ReportWindow::for_day(NaiveDate::from_ymd_opt(2023, 10, 16).unwrap())
    }

    #[test]
    fn test_window_bounds() {
        let window = ReportWindow::previous_day(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(window.start(), "2023-02-28");
        assert_eq!(window.end(), "2023-02-28T23:59:59");
    }

    #[tokio::test]
    async fn test_compile_digest() {
        let (job, indexer) = job(
            activity(vec![block("AAA", 30), block("BBB", 10), block("CCC", 5)], 1_234_567.0),
            &[("AAA", 3_000_000_000), ("BBB", 1_000_000_000), ("CCC", 500_000)],
        );

        let digest = job.compile(&window()).await.unwrap().unwrap();

        assert_eq!(digest.total_blocks, 45);
        assert_eq!(digest.biggest_proposer, "AAA");
        assert_eq!(digest.biggest_proposer_name, "aaa.algo");
        assert_eq!(digest.proposer_count, 3);
        assert_eq!(digest.min_balance, 500_000);
        assert_eq!(digest.max_balance, 3_000_000_000);
        assert_eq!(indexer.queried.lock().unwrap().len(), 3);

        let message = job.render(&digest).unwrap();
        assert!(message.starts_with(
            "🕰 On Oct 16th #Algorand has had 45 blocks proposed and 1,234,567 transactions."
        ));
        assert!(message.contains("aaa.algo proposed the most blocks"));
        assert!(message.contains("Average of balances of all proposers is 1,333 ALGO"));
        assert!(message.contains("the smallest proposer had ~0.1 ALGO"));
        assert!(message.contains("the biggest proposer had 3,000 ALGO"));
    }

    #[tokio::test]
    async fn test_repeated_proposer_queried_once() {
        let (job, indexer) = job(
            activity(vec![block("AAA", 3), block("AAA", 2)], 10.0),
            &[("AAA", 2_000_000)],
        );

        let digest = job.compile(&window()).await.unwrap().unwrap();

        assert_eq!(digest.total_blocks, 5);
        assert_eq!(digest.proposer_count, 1);
        assert_eq!(*indexer.queried.lock().unwrap(), vec!["AAA"]);
    }

    #[tokio::test]
    async fn test_no_blocks_publishes_nothing() {
        let (job, indexer) = job(activity(vec![], 10.0), &[]);
        let outcome = job.run(&window(), &PublisherSet::new(Vec::new())).await.unwrap();

        assert_eq!(outcome, DigestOutcome::NoActivity);
        assert!(indexer.queried.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_transactions_publishes_nothing() {
        let mut activity = activity(vec![block("AAA", 3)], 0.0);
        activity.transactions.clear();
        let (job, _) = job(activity, &[("AAA", 1)]);

        assert!(job.compile(&window()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_balance_failure_fails_digest() {
        let (job, _) = job(activity(vec![block("AAA", 3), block("BBB", 1)], 10.0), &[("AAA", 1)]);
        assert!(job.compile(&window()).await.is_err());
    }

    #[tokio::test]
    async fn test_custom_template() {
        let (job, _) = job(activity(vec![block("AAA", 3)], 10.0), &[("AAA", 7_000_000)]);
        let job = job
            .with_template("{{date}}: {{total_blocks}} blocks by {{proposer_count}} proposers")
            .unwrap();

        let digest = job.compile(&window()).await.unwrap().unwrap();
        assert_eq!(job.render(&digest).unwrap(), "Oct 16th: 3 blocks by 1 proposers");
    }
}

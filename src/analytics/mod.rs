//! 链上数据分析模块
//!
//! 每日出块摘要：区块浏览器、账户索引器、域名解析以及消息格式化

pub mod digest;
pub mod explorer;
pub mod format;
pub mod indexer;

// 重新导出主要类型
pub use digest::{DigestJob, DigestOutcome, ProposerDigest, ReportWindow};
pub use explorer::{BitqueryExplorer, BlockExplorer, DailyActivity, ProposerBlocks, TransactionDay};
pub use indexer::{AccountIndexer, HttpIndexer, NameResolver, NfdResolver};

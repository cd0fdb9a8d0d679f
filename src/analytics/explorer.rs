//! 区块浏览器客户端
//!
//! 通过 Bitquery GraphQL 接口查询某一天按出块地址分组的区块数和交易总数

use crate::analytics::digest::ReportWindow;
use crate::error::DigestError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const DAILY_ACTIVITY_QUERY: &str = r#"
query ($limit: Int!, $offset: Int!, $from: ISO8601DateTime, $till: ISO8601DateTime) {
  algorand(network: algorand) {
    blocks(
      options: {desc: "count", asc: "address.address", limit: $limit, offset: $offset}
      date: {since: $from, till: $till}
    ) {
      address: proposer {
        address
        annotation
      }
      count
      min_date: minimum(of: date)
      max_date: maximum(of: date)
    }
    transactions(options: {asc: "date.date"}, date: {since: $from, till: $from}) {
      date: date {
        date
      }
      count: countBigInt
      fee
    }
  }
}
"#;

/// 单个出块地址在窗口内的出块数
#[derive(Debug, Clone, PartialEq)]
pub struct ProposerBlocks {
    pub address: String,
    pub annotation: Option<String>,
    pub count: u64,
}

/// 某一天的交易统计
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDay {
    pub date: Option<String>,
    pub count: f64,
    pub fee: Option<f64>,
}

/// 窗口内的链上活动，出块地址按出块数降序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyActivity {
    pub blocks: Vec<ProposerBlocks>,
    pub transactions: Vec<TransactionDay>,
}

/// 区块浏览器trait
#[async_trait]
pub trait BlockExplorer: Send + Sync {
    /// 查询报告窗口内的链上活动
    async fn daily_activity(&self, window: &ReportWindow) -> Result<DailyActivity, DigestError>;
}

/// Bitquery GraphQL 客户端
pub struct BitqueryExplorer {
    client: Client,
    url: String,
    api_key: Option<String>,
    limit: u32,
}

impl BitqueryExplorer {
    /// 创建客户端
    ///
    /// # 参数
    /// * `url` - GraphQL 接口地址
    /// * `api_key` - `X-API-KEY` 请求头
    /// * `limit` - 出块地址数量上限
    /// * `timeout` - 请求超时时间
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        limit: u32,
        timeout: Duration,
    ) -> Result<Self, DigestError> {
        let client = Client::builder().timeout(timeout).build()?;
        if api_key.is_none() {
            warn!("未配置区块浏览器 API Key，请求可能被拒绝");
        }

        Ok(Self {
            client,
            url: url.into(),
            api_key,
            limit,
        })
    }

    fn variables(&self, window: &ReportWindow) -> serde_json::Value {
        json!({
            "limit": self.limit,
            "offset": 0,
            "from": window.start(),
            "till": window.end(),
            "dateFormat": "%Y-%m-%d",
        })
    }
}

#[async_trait]
impl BlockExplorer for BitqueryExplorer {
    async fn daily_activity(&self, window: &ReportWindow) -> Result<DailyActivity, DigestError> {
        debug!("查询区块浏览器: {} ~ {}", window.start(), window.end());

        let mut request = self.client.post(&self.url).json(&json!({
            "query": DAILY_ACTIVITY_QUERY,
            "variables": self.variables(window),
        }));
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::UpstreamStatus {
                service: "bitquery".to_string(),
                status: status.as_u16(),
            });
        }

        let body: GraphQlResponse = response.json().await?;
        body.into_activity()
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ExplorerData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ExplorerData {
    algorand: Option<AlgorandData>,
}

#[derive(Debug, Deserialize)]
struct AlgorandData {
    blocks: Option<Vec<BlockRow>>,
    transactions: Option<Vec<TransactionRow>>,
}

#[derive(Debug, Deserialize)]
struct BlockRow {
    address: ProposerRef,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct ProposerRef {
    address: String,
    annotation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionRow {
    date: Option<DateRef>,
    count: Count,
    fee: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DateRef {
    date: String,
}

/// `countBigInt` 以字符串返回，旧接口以数字返回
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(f64),
    Text(String),
}

impl Count {
    fn value(&self) -> Result<f64, DigestError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| DigestError::MalformedResponse(format!("无效的交易数: {s}"))),
        }
    }
}

impl GraphQlResponse {
    fn into_activity(self) -> Result<DailyActivity, DigestError> {
        if !self.errors.is_empty() {
            let messages: Vec<_> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(DigestError::GraphQl(messages.join("; ")));
        }

        let algorand = self
            .data
            .and_then(|data| data.algorand)
            .ok_or_else(|| DigestError::MalformedResponse("缺少 data.algorand".to_string()))?;

        let blocks = algorand
            .blocks
            .unwrap_or_default()
            .into_iter()
            .map(|row| ProposerBlocks {
                address: row.address.address,
                annotation: row.address.annotation,
                count: row.count,
            })
            .collect();

        let transactions = algorand
            .transactions
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                Ok(TransactionDay {
                    date: row.date.map(|d| d.date),
                    count: row.count.value()?,
                    fee: row.fee,
                })
            })
            .collect::<Result<_, DigestError>>()?;

        Ok(DailyActivity {
            blocks,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mockito::Matcher;

    fn window() -> ReportWindow {
        ReportWindow::for_day(NaiveDate::from_ymd_opt(2023, 10, 16).unwrap())
    }

    fn explorer(url: String) -> BitqueryExplorer {
        BitqueryExplorer::new(url, Some("key".to_string()), 1000, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_daily_activity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-api-key", "key")
            .match_body(Matcher::PartialJson(json!({
                "variables": {"from": "2023-10-16", "till": "2023-10-16T23:59:59", "limit": 1000}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "data": {"algorand": {
                        "blocks": [
                            {"address": {"address": "AAA", "annotation": null}, "count": 30},
                            {"address": {"address": "BBB", "annotation": "pool"}, "count": 10}
                        ],
                        "transactions": [
                            {"date": {"date": "2023-10-16"}, "count": "1234567", "fee": 12.5}
                        ]
                    }}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let activity = explorer(server.url()).daily_activity(&window()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(activity.blocks.len(), 2);
        assert_eq!(activity.blocks[0].address, "AAA");
        assert_eq!(activity.blocks[1].annotation.as_deref(), Some("pool"));
        assert_eq!(activity.transactions[0].count, 1_234_567.0);
    }

    #[tokio::test]
    async fn test_null_lists_are_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"data":{"algorand":{"blocks":null,"transactions":[]}}}"#)
            .create_async()
            .await;

        let activity = explorer(server.url()).daily_activity(&window()).await.unwrap();
        assert!(activity.blocks.is_empty());
        assert!(activity.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_graphql_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"data":null,"errors":[{"message":"Unauthorized"}]}"#)
            .create_async()
            .await;

        let err = explorer(server.url()).daily_activity(&window()).await.unwrap_err();
        assert!(matches!(err, DigestError::GraphQl(ref m) if m == "Unauthorized"));
    }

    #[tokio::test]
    async fn test_upstream_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/").with_status(401).create_async().await;

        let err = explorer(server.url()).daily_activity(&window()).await.unwrap_err();
        assert!(matches!(err, DigestError::UpstreamStatus { status: 401, .. }));
    }

    #[test]
    fn test_count_accepts_number_and_text() {
        assert_eq!(Count::Number(5.0).value().unwrap(), 5.0);
        assert_eq!(Count::Text("42".to_string()).value().unwrap(), 42.0);
        assert!(Count::Text("many".to_string()).value().is_err());
    }
}

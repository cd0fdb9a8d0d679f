//! 账户索引器与域名解析客户端

use crate::analytics::format::ellipse_address;
use crate::error::DigestError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// 地址缩写时首尾保留的字符数
const ADDRESS_ELLIPSIS_WIDTH: usize = 3;

/// 账户索引器trait
#[async_trait]
pub trait AccountIndexer: Send + Sync {
    /// 查询账户余额（不含待领取奖励，单位 microAlgos）
    async fn balance(&self, address: &str) -> Result<u64, DigestError>;
}

/// 域名解析trait
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// 把地址解析为可读名称；失败时返回缩写地址，从不报错
    async fn display_name(&self, address: &str) -> String;
}

fn build_client(timeout: Duration) -> Result<Client, DigestError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
        .build()?)
}

/// Algorand 索引器 HTTP 客户端
pub struct HttpIndexer {
    client: Client,
    base_url: String,
}

impl HttpIndexer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DigestError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: AccountInfo,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    #[serde(rename = "amount-without-pending-rewards")]
    amount_without_pending_rewards: u64,
}

#[async_trait]
impl AccountIndexer for HttpIndexer {
    async fn balance(&self, address: &str) -> Result<u64, DigestError> {
        let url = format!("{}/v2/accounts/{}", self.base_url, address);
        debug!("查询账户余额: {}", address);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::UpstreamStatus {
                service: "indexer".to_string(),
                status: status.as_u16(),
            });
        }

        let body: AccountResponse = response
            .json()
            .await
            .map_err(|e| DigestError::MalformedResponse(format!("账户 {address}: {e}")))?;
        Ok(body.account.amount_without_pending_rewards)
    }
}

/// NFD 域名解析客户端
pub struct NfdResolver {
    client: Client,
    base_url: String,
}

impl NfdResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DigestError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn lookup(&self, address: &str) -> Result<Option<String>, DigestError> {
        let response = self
            .client
            .get(format!("{}/nfd", self.base_url))
            .query(&[("owner", address)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::UpstreamStatus {
                service: "nfd".to_string(),
                status: status.as_u16(),
            });
        }

        let records: Vec<NfdRecord> = response.json().await?;
        Ok(records.into_iter().next().map(|record| record.name))
    }
}

#[derive(Debug, Deserialize)]
struct NfdRecord {
    name: String,
}

#[async_trait]
impl NameResolver for NfdResolver {
    async fn display_name(&self, address: &str) -> String {
        match self.lookup(address).await {
            Ok(Some(name)) => name,
            Ok(None) => ellipse_address(address, ADDRESS_ELLIPSIS_WIDTH),
            Err(e) => {
                debug!("解析地址 {} 的域名失败: {}", address, e);
                ellipse_address(address, ADDRESS_ELLIPSIS_WIDTH)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const ADDRESS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    #[tokio::test]
    async fn test_balance() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/v2/accounts/{ADDRESS}").as_str())
            .with_status(200)
            .with_body(
                r#"{"account":{"amount":5,"amount-without-pending-rewards":4200000},"current-round":1}"#,
            )
            .create_async()
            .await;

        let indexer =
            HttpIndexer::new(&format!("{}/", server.url()), Duration::from_secs(5)).unwrap();
        assert_eq!(indexer.balance(ADDRESS).await.unwrap(), 4_200_000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_balance_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let indexer = HttpIndexer::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = indexer.balance(ADDRESS).await.unwrap_err();
        assert!(matches!(err, DigestError::UpstreamStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_display_name_uses_first_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/nfd")
            .match_query(Matcher::UrlEncoded("owner".into(), ADDRESS.into()))
            .with_status(200)
            .with_body(r#"[{"name":"proposer.algo"},{"name":"other.algo"}]"#)
            .create_async()
            .await;

        let resolver = NfdResolver::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert_eq!(resolver.display_name(ADDRESS).await, "proposer.algo");
    }

    #[tokio::test]
    async fn test_display_name_falls_back_to_ellipsis() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/nfd")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let resolver = NfdResolver::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert_eq!(resolver.display_name(ADDRESS).await, "ABC...XYZ");
    }

    #[tokio::test]
    async fn test_display_name_on_error() {
        let resolver = NfdResolver::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert_eq!(resolver.display_name(ADDRESS).await, "ABC...XYZ");
    }
}

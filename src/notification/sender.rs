//! 消息发布器模块
//!
//! 定义发布接口、消息截断规则，以及把一条消息分发到所有接收端的发布器集合

use crate::config::types::PublisherConfig;
use crate::error::NotificationError;
use crate::notification::feishu::FeishuPublisher;
use crate::notification::social::SocialPublisher;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

/// 单条消息的最大字符数
pub const MAX_MESSAGE_CHARS: usize = 280;

const ELLIPSIS: &str = "...";

/// 发布器默认请求超时
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(30);

/// 按字符截断消息
///
/// 超过 [`MAX_MESSAGE_CHARS`] 的消息保留前 277 个字符并追加 `...`，
/// 结果恰好为 280 个字符；不超过上限的消息原样返回。
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }

    let keep = MAX_MESSAGE_CHARS - ELLIPSIS.chars().count();
    let mut truncated: String = message.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// 宕机告警
    Alert,
    /// 每日出块摘要
    Digest,
    /// 信息消息（测试消息等）
    Info,
}

/// 消息发布器trait
#[async_trait]
pub trait Publisher: Send + Sync {
    /// 发布器名称，用于日志
    fn name(&self) -> &str;

    /// 发布一条纯文本消息
    ///
    /// # 参数
    /// * `message` - 消息内容
    /// * `kind` - 消息类型，接收端可据此调整展示样式
    ///
    /// # 返回
    /// * `Result<()>` - 发布结果
    async fn publish(&self, message: &str, kind: MessageKind) -> Result<()>;
}

/// 控制台发布器，只打印不外发（演练模式或未配置任何接收端时使用）
pub struct ConsolePublisher;

#[async_trait]
impl Publisher for ConsolePublisher {
    fn name(&self) -> &str {
        "console"
    }

    async fn publish(&self, message: &str, _kind: MessageKind) -> Result<()> {
        println!("{}", truncate_message(message));
        Ok(())
    }
}

/// 一次分发的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// 成功投递次数
    pub delivered: usize,
    /// 失败次数
    pub failed: usize,
}

impl PublishSummary {
    /// 合并另一次分发的统计
    pub fn merge(&mut self, other: PublishSummary) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }

    /// 是否全部成功
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// 发布器集合
///
/// 把每条消息依次交给所有接收端。单个接收端失败只记录日志，
/// 不影响其他接收端，也不影响后续消息。
pub struct PublisherSet {
    publishers: Vec<Box<dyn Publisher>>,
}

impl PublisherSet {
    pub fn new(publishers: Vec<Box<dyn Publisher>>) -> Self {
        Self { publishers }
    }

    /// 根据配置构建发布器集合
    ///
    /// 演练模式或未配置任何接收端时只包含控制台发布器。
    pub fn from_config(config: &PublisherConfig) -> Result<Self, NotificationError> {
        if config.dry_run {
            info!("演练模式，消息只输出到控制台");
            return Ok(Self::console());
        }

        let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();
        if let Some(social) = &config.social {
            publishers.push(Box::new(SocialPublisher::new(social, DEFAULT_PUBLISH_TIMEOUT)?));
        }
        if let Some(relay) = &config.relay {
            publishers.push(Box::new(FeishuPublisher::new(relay, DEFAULT_PUBLISH_TIMEOUT)?));
        }

        if publishers.is_empty() {
            info!("未配置任何消息接收端，消息只输出到控制台");
            return Ok(Self::console());
        }

        Ok(Self::new(publishers))
    }

    /// 只包含控制台发布器的集合
    pub fn console() -> Self {
        Self::new(vec![Box::new(ConsolePublisher)])
    }

    /// 所有接收端名称
    pub fn names(&self) -> Vec<&str> {
        self.publishers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// 把一条消息分发到所有接收端
    pub async fn publish(&self, message: &str, kind: MessageKind) -> PublishSummary {
        let mut summary = PublishSummary::default();

        for publisher in &self.publishers {
            match publisher.publish(message, kind).await {
                Ok(()) => {
                    debug!("消息已通过 {} 发布", publisher.name());
                    summary.delivered += 1;
                }
                Err(e) => {
                    error!("通过 {} 发布消息失败: {:#}", publisher.name(), e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{RelayConfig, SocialConfig};
    use std::sync::{Arc, Mutex};

    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        fn name(&self) -> &str {
            "recording"
        }

        async fn publish(&self, message: &str, _kind: MessageKind) -> Result<()> {
            if self.fail {
                anyhow::bail!("sink unavailable");
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_truncate_long_message() {
        let message = "a".repeat(300);
        let truncated = truncate_message(&message);
        assert_eq!(truncated.chars().count(), 280);
        assert!(truncated.ends_with("..."));
        assert_eq!(&truncated[..277], &message[..277]);
    }

    #[test]
    fn test_short_message_unchanged() {
        let exact = "b".repeat(280);
        assert_eq!(truncate_message(&exact), exact);
        assert_eq!(truncate_message("hello"), "hello");
    }

    #[test]
    fn test_truncate_counts_characters() {
        let message = "🚧".repeat(281);
        let truncated = truncate_message(&message);
        assert_eq!(truncated.chars().count(), 280);
        assert!(truncated.starts_with("🚧🚧"));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_sinks() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let set = PublisherSet::new(vec![
            Box::new(RecordingPublisher {
                sent: sent.clone(),
                fail: true,
            }),
            Box::new(RecordingPublisher {
                sent: sent.clone(),
                fail: false,
            }),
        ]);

        let mut summary = set.publish("first", MessageKind::Alert).await;
        summary.merge(set.publish("second", MessageKind::Alert).await);

        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 2);
        assert!(!summary.is_success());
        assert_eq!(*sent.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_from_config_without_sinks_uses_console() {
        let set = PublisherSet::from_config(&PublisherConfig::default()).unwrap();
        assert_eq!(set.names(), vec!["console"]);
    }

    #[test]
    fn test_from_config_dry_run_ignores_sinks() {
        let config = PublisherConfig {
            dry_run: true,
            social: Some(SocialConfig {
                url: "https://example.com/2/tweets".to_string(),
                bearer_token: None,
            }),
            relay: None,
        };
        let set = PublisherSet::from_config(&config).unwrap();
        assert_eq!(set.names(), vec!["console"]);
    }

    #[test]
    fn test_from_config_builds_all_sinks() {
        let config = PublisherConfig {
            dry_run: false,
            social: Some(SocialConfig {
                url: "https://example.com/2/tweets".to_string(),
                bearer_token: Some("token".to_string()),
            }),
            relay: Some(RelayConfig {
                webhook_url: "https://open.feishu.cn/open-apis/bot/v2/hook/x".to_string(),
                secret: None,
            }),
        };
        let set = PublisherSet::from_config(&config).unwrap();
        assert_eq!(set.names(), vec!["social", "feishu"]);
        assert_eq!(set.len(), 2);
    }
}

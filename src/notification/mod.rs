//! 通知模块
//!
//! 提供消息发布器（社交媒体、飞书中继、控制台）和消息模板功能

pub mod feishu;
pub mod sender;
pub mod social;
pub mod template;

// 重新导出主要类型
pub use feishu::FeishuPublisher;
pub use sender::{
    truncate_message, ConsolePublisher, MessageKind, PublishSummary, Publisher, PublisherSet,
    MAX_MESSAGE_CHARS,
};
pub use social::SocialPublisher;
pub use template::{HandlebarsTemplate, MessageTemplate};

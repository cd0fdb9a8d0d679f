//! 消息模板模块
//!
//! 基于 handlebars 渲染告警与每日摘要消息

use crate::error::NotificationError;
use handlebars::Handlebars;
use serde_json::Value;

const TEMPLATE_NAME: &str = "message";

/// 比例策略的默认告警模板
pub const DEFAULT_RATIO_ALERT_TEMPLATE: &str = "🚧 WARNING: {{title}} was down for {{percent}}% of checks in the past {{window_minutes}} minutes! 🕰";

/// 时长策略的默认告警模板
pub const DEFAULT_DURATION_ALERT_TEMPLATE: &str = "🚧 WARNING: {{title}} has been down for {{minutes}} minutes in the past {{window_minutes}} minutes! 🕰";

/// 每日摘要的默认模板
pub const DEFAULT_DIGEST_TEMPLATE: &str = "🕰 On {{date}} #Algorand has had {{total_blocks}} blocks proposed and {{total_transactions}} transactions. The following address {{biggest_proposer}} proposed the most blocks. Average of balances of all proposers is {{average_balance}} ALGO, the smallest proposer had {{min_balance}} ALGO and the biggest proposer had {{max_balance}} ALGO";

/// 消息模板trait
pub trait MessageTemplate: Send + Sync {
    /// 渲染模板
    ///
    /// # 参数
    /// * `context` - 模板上下文
    ///
    /// # 返回
    /// * `Result<String, NotificationError>` - 渲染后的消息
    fn render(&self, context: &Value) -> Result<String, NotificationError>;
}

/// Handlebars模板
///
/// 纯文本输出，不做HTML转义；引用未提供的变量视为错误。
#[derive(Debug, Clone)]
pub struct HandlebarsTemplate {
    registry: Handlebars<'static>,
}

impl HandlebarsTemplate {
    /// 编译模板
    ///
    /// # 参数
    /// * `template` - 模板字符串
    pub fn new(template: &str) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))?;

        Ok(Self { registry })
    }

    /// 用示例上下文试渲染一次，提前暴露引用了未知变量的模板
    pub fn validate(&self, sample: &Value) -> Result<(), NotificationError> {
        self.render(sample).map(|_| ())
    }
}

impl MessageTemplate for HandlebarsTemplate {
    fn render(&self, context: &Value) -> Result<String, NotificationError> {
        self.registry
            .render(TEMPLATE_NAME, context)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }
}

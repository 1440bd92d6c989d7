//! tracing 桥接层
//!
//! [`RouterLayer`] 把 `tracing` 事件送入 [`Logger`]，通过 `tracing` 输出日志的
//! 第三方库与直接调用落到相同的 sink。

use crate::core::level::Rank;
use crate::core::logger::Logger;
use crate::core::record::Caller;
use crate::error::{Result, StrataLogError};
use serde_json::{Number, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// 本库自身模块的事件不桥接，避免递归
const OWN_TARGET: &str = "strata_log";

/// 通过 [`Logger`] 路由事件的 `tracing_subscriber` 层
#[derive(Debug, Clone)]
pub struct RouterLayer {
    logger: Logger,
}

impl RouterLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// 收集 `message` 字段，其余字段按出现顺序保存
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, Value)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::Number(Number::from(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::Number(Number::from(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.push(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }
}

impl<S> Layer<S> for RouterLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) {
            return;
        }

        let rank = Rank::from(*metadata.level());
        if !self.logger.enabled(rank) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| format!("Event from {}", metadata.target()));
        let caller = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(Caller::new(file, line)),
            _ => None,
        };
        self.logger.log_event(rank, message, visitor.fields, caller);
    }
}

fn is_own_target(target: &str) -> bool {
    target == OWN_TARGET
        || target
            .strip_prefix(OWN_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

impl Logger {
    /// 把带有本日志器 [`RouterLayer`] 的 registry 安装为全局 `tracing` 订阅器
    pub fn install_global_tracing(&self) -> Result<()> {
        let subscriber = tracing_subscriber::registry().with(RouterLayer::new(self.clone()));
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| StrataLogError::tracing(format!("failed to set global subscriber: {}", e)))
    }
}

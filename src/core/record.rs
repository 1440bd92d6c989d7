//! 日志记录定义
//!
//! 每次发射调用只生成一个 [`LogRecord`]，交给路由器之后即为只读。

use crate::core::level::Rank;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::panic::Location;

/// 发射调用的源码位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    pub fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// 截取为 `dir/file:line` 形式
    pub fn short(&self) -> String {
        let normalized = self.file.replace('\\', "/");
        let mut parts = normalized.rsplitn(3, '/');
        let file = parts.next().unwrap_or_default();
        match parts.next() {
            Some(dir) => format!("{}/{}:{}", dir, file, self.line),
            None => format!("{}:{}", file, self.line),
        }
    }
}

impl From<&'static Location<'static>> for Caller {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// 一条结构化日志记录
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    rank: Rank,
    message: String,
    fields: Vec<(String, Value)>,
    timestamp: DateTime<Utc>,
    caller: Option<Caller>,
    stacktrace: Option<String>,
    logger_name: Option<String>,
}

impl LogRecord {
    /// 以当前时间创建记录
    pub fn new(rank: Rank, message: impl Into<String>) -> Self {
        Self {
            rank,
            message: message.into(),
            fields: Vec::new(),
            timestamp: Utc::now(),
            caller: None,
            stacktrace: None,
            logger_name: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    /// 追加字段，保持插入顺序
    pub fn with_fields<I, K>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// `key` 对应的第一个值
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn caller(&self) -> Option<Caller> {
        self.caller
    }

    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref()
    }

    pub fn logger_name(&self) -> Option<&str> {
        self.logger_name.as_deref()
    }
}

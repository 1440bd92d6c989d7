//! 日志级别与级别解析

use serde::{Serialize, Serializer};
use std::fmt;

/// 日志记录的严重级别
///
/// 声明顺序即严重程度顺序：`Debug` 最低，`Fatal` 最高。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Debug,
    Info,
    Warn,
    Error,
    /// 开发模式下路由后触发 panic
    DPanic,
    /// 路由后触发 panic
    Panic,
    /// 路由后刷新所有 sink 并退出进程
    Fatal,
}

impl Rank {
    /// 所有级别，从低到高
    pub const ALL: [Rank; 7] = [
        Rank::Debug,
        Rank::Info,
        Rank::Warn,
        Rank::Error,
        Rank::DPanic,
        Rank::Panic,
        Rank::Fatal,
    ];

    /// 配置中使用的规范名称
    pub fn name(self) -> &'static str {
        match self {
            Rank::Debug => "debug",
            Rank::Info => "info",
            Rank::Warn => "warn",
            Rank::Error => "error",
            Rank::DPanic => "dpanic",
            Rank::Panic => "panic",
            Rank::Fatal => "fatal",
        }
    }

    /// 编码器使用的大写形式
    pub fn as_capital_str(self) -> &'static str {
        match self {
            Rank::Debug => "DEBUG",
            Rank::Info => "INFO",
            Rank::Warn => "WARN",
            Rank::Error => "ERROR",
            Rank::DPanic => "DPANIC",
            Rank::Panic => "PANIC",
            Rank::Fatal => "FATAL",
        }
    }

    /// 该级别的记录是否附带调用栈
    pub fn wants_stacktrace(self) -> bool {
        self >= Rank::Warn
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_capital_str())
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_capital_str())
    }
}

impl From<tracing::Level> for Rank {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Rank::Debug,
            tracing::Level::INFO => Rank::Info,
            tracing::Level::WARN => Rank::Warn,
            tracing::Level::ERROR => Rank::Error,
        }
    }
}

/// 把配置中的级别名称解析为级别
///
/// 区分大小写，只识别小写的规范名称，其他输入一律解析为 [`Rank::Info`]。
pub fn rank_of(name: &str) -> Rank {
    match name {
        "debug" => Rank::Debug,
        "info" => Rank::Info,
        "warn" => Rank::Warn,
        "error" => Rank::Error,
        "dpanic" => Rank::DPanic,
        "panic" => Rank::Panic,
        "fatal" => Rank::Fatal,
        _ => Rank::Info,
    }
}

//! StrataLog Sink Traits
//!
//! 定义了统一的同步 Sink trait 接口。路由器持有 `Arc<dyn LogSink>`，
//! 在调用方线程上直接写入已编码的字节。
//!
//! # 使用示例
//!
//! ```rust
//! use strata_log::sinks::traits::{LogSink, SinkResult};
//!
//! #[derive(Debug)]
//! struct CountingSink {
//!     count: std::sync::atomic::AtomicUsize,
//! }
//!
//! impl LogSink for CountingSink {
//!     fn write(&self, bytes: &[u8]) -> SinkResult<usize> {
//!         self.count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         Ok(bytes.len())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "counting"
//!     }
//! }
//! ```

use std::fmt::Debug;

/// 基础 Sink trait
///
/// 所有日志输出目标都必须实现此 trait。实现必须自行保证并发写入的互斥，
/// 同一个 sink 上的写入顺序即为调用进入 `write` 的顺序。
pub trait LogSink: Send + Sync + Debug {
    /// 写入一条已编码的日志记录
    fn write(&self, bytes: &[u8]) -> SinkResult<usize>;

    /// 将缓冲内容刷新到底层存储
    fn sync(&self) -> SinkResult<()> {
        Ok(())
    }

    /// 关闭 sink，释放文件句柄并等待后台任务结束
    fn close(&self) -> SinkResult<()> {
        self.sync()
    }

    /// 获取 sink 的名称，用于诊断输出
    fn name(&self) -> &str;
}

/// Sink 错误类型
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write of {len} bytes exceeds maximum file size {max}")]
    TooLarge { len: usize, max: u64 },

    #[error("Rotation error: {0}")]
    Rotation(String),

    #[error("Sink is closed")]
    Closed,

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Sink 结果类型
pub type SinkResult<T> = Result<T, SinkError>;

impl From<crate::error::StrataLogError> for SinkError {
    fn from(err: crate::error::StrataLogError) -> Self {
        match err {
            crate::error::StrataLogError::IoError { source } => SinkError::Io(source),
            other => SinkError::Generic(other.to_string()),
        }
    }
}

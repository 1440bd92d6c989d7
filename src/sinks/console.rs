//! 控制台输出 Sink 实现
//!
//! 将已编码的日志记录写入标准输出或标准错误。写入时持有流的锁，
//! 保证同一条记录不会与其他线程的输出交错。

use crate::sinks::traits::{LogSink, SinkResult};
use std::io::{self, Write};

/// 控制台输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// 控制台输出 Sink
#[derive(Debug, Default)]
pub struct ConsoleSink {
    target: ConsoleTarget,
}

impl ConsoleSink {
    /// 创建写入标准输出的 Sink
    pub fn stdout() -> Self {
        Self {
            target: ConsoleTarget::Stdout,
        }
    }

    /// 创建写入标准错误的 Sink
    pub fn stderr() -> Self {
        Self {
            target: ConsoleTarget::Stderr,
        }
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, bytes: &[u8]) -> SinkResult<usize> {
        match self.target {
            ConsoleTarget::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()?;
            }
            ConsoleTarget::Stderr => {
                let mut out = io::stderr().lock();
                out.write_all(bytes)?;
                out.flush()?;
            }
        }
        Ok(bytes.len())
    }

    fn sync(&self) -> SinkResult<()> {
        match self.target {
            ConsoleTarget::Stdout => io::stdout().flush()?,
            ConsoleTarget::Stderr => io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        match self.target {
            ConsoleTarget::Stdout => "stdout",
            ConsoleTarget::Stderr => "stderr",
        }
    }
}

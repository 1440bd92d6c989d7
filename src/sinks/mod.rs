//! StrataLog Sinks 模块
//!
//! 提供日志输出目标的实现：控制台、滚动文件和内存。所有 sink 都实现同步的
//! [`LogSink`] trait，由路由器在调用方线程上直接写入。

pub mod console;
pub mod file_common;
pub mod memory;
pub mod rolling_file;
pub mod traits;

// 重新导出主要类型
pub use console::{ConsoleSink, ConsoleTarget};
pub use memory::MemorySink;
pub use rolling_file::RollingFileSink;
pub use traits::{LogSink, SinkError, SinkResult};

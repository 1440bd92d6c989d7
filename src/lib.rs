//! StrataLog - 分层结构化日志库
//!
//! StrataLog 按级别把结构化日志记录路由到控制台和滚动文件。文件按大小轮转，
//! 备份按数量和期限清理，并可在后台压缩。
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = strata_log::load_config_from_str(
//!         r#"
//!         svc_name = "billing"
//!         [log]
//!         level = "debug"
//!         multi_staging = true
//!         "#,
//!     )?;
//!     strata_log::init(&config)?;
//!
//!     strata_log::info(&[&"service started on port", &8080]);
//!     strata_log::warnf!("cache miss ratio {:.2}", 0.37);
//!     strata_log::errorw("charge failed", &[("order_id", json!(42))]);
//!
//!     strata_log::sync()?;
//!     Ok(())
//! }
//! ```
//!
//! # 显式句柄
//!
//! ```rust
//! use strata_log::core::router::{Binding, LevelPredicate, RouterTopology};
//! use strata_log::core::{EncoderProfile, EncoderShape, Rank};
//! use strata_log::sinks::MemorySink;
//! use strata_log::Logger;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new("memory"));
//! let topology = RouterTopology::new(
//!     vec![Binding::new(
//!         "memory",
//!         LevelPredicate::AtLeast(Rank::Info),
//!         EncoderShape::Json,
//!         sink.clone(),
//!     )],
//!     EncoderProfile::new(),
//! );
//! let logger = Logger::new(topology).named("api");
//! logger.infof(format_args!("handled {} requests", 3));
//! assert_eq!(sink.len(), 1);
//! ```

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod sinks;
pub mod utils;

// 重新导出主要类型
pub use crate::config::{
    load_config_from_file, load_config_from_str, LogConfig, RotateConfig, SinkConfig,
    StrataLogConfig,
};
pub use crate::core::level::{rank_of, Rank};
pub use crate::core::logger::{Logger, LoggerOptions};
pub use crate::core::record::LogRecord;
pub use crate::core::topology::TopologyReport;
pub use crate::diagnostics::DiagnosticsSnapshot;
pub use crate::error::{Result, StrataLogError};
pub use serde_json::Value;

use once_cell::sync::Lazy;
use std::fmt;
use std::path::Path;
use std::sync::RwLock;

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 全局默认日志句柄
///
/// 初始化之前是一个只输出到标准输出、级别为 info 的控制台日志器。
static GLOBAL_LOGGER: Lazy<RwLock<Logger>> = Lazy::new(|| RwLock::new(Logger::console_default()));

/// 获取全局默认日志句柄的克隆
pub fn logger() -> Logger {
    GLOBAL_LOGGER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// 替换全局默认日志句柄，返回旧的句柄
pub fn set_global_logger(logger: Logger) -> Logger {
    let mut guard = GLOBAL_LOGGER.write().unwrap_or_else(|e| e.into_inner());
    std::mem::replace(&mut *guard, logger)
}

/// 使用指定配置初始化全局日志器
///
/// 文件路径不可用时降级为仅控制台输出，问题记录在返回的报告中。
/// 新拓扑原子地换入现有的全局句柄，之前通过 [`logger()`] 取得的克隆也随之
/// 切换；旧的 sink 在最后一次进行中的写入结束后关闭。
pub fn init(config: &StrataLogConfig) -> Result<TopologyReport> {
    Ok(logger().reconfigure(config))
}

/// 从键值配置源初始化全局日志器
pub fn init_from_source(source: &::config::Config) -> Result<TopologyReport> {
    let config = StrataLogConfig::from_source(source)?;
    init(&config)
}

/// 从配置文件初始化全局日志器
pub fn init_from_file(path: &Path) -> Result<TopologyReport> {
    let config = load_config_from_file(path)?;
    init(&config)
}

/// 把全局日志器安装为 `tracing` 的全局订阅器
pub fn install_global_tracing() -> Result<()> {
    logger().install_global_tracing()
}

/// 刷新全局日志器的所有 sink
pub fn sync() -> Result<()> {
    logger().sync()
}

/// 全局日志器的诊断快照
pub fn diagnostics() -> DiagnosticsSnapshot {
    logger().diagnostics()
}

macro_rules! global_emitters {
    ($($plain:ident, $formatted:ident, $keyed:ident;)*) => {
        $(
            #[doc = concat!("在全局日志器上调用 [`Logger::", stringify!($plain), "`]")]
            #[track_caller]
            pub fn $plain(args: &[&dyn fmt::Display]) {
                logger().$plain(args);
            }

            #[doc = concat!("在全局日志器上调用 [`Logger::", stringify!($formatted), "`]")]
            #[track_caller]
            pub fn $formatted(args: fmt::Arguments<'_>) {
                logger().$formatted(args);
            }

            #[doc = concat!("在全局日志器上调用 [`Logger::", stringify!($keyed), "`]")]
            #[track_caller]
            pub fn $keyed(msg: &str, fields: &[(&str, Value)]) {
                logger().$keyed(msg, fields);
            }
        )*
    };
}

global_emitters! {
    debug, debugf, debugw;
    info, infof, infow;
    warn, warnf, warnw;
    error, errorf, errorw;
    dpanic, dpanicf, dpanicw;
    panic, panicf, panicw;
    fatal, fatalf, fatalw;
}

/// 在全局日志器上以格式化字符串输出 Debug 级别日志
#[macro_export]
macro_rules! debugf {
    ($($arg:tt)+) => {
        $crate::debugf(::std::format_args!($($arg)+))
    };
}

/// 在全局日志器上以格式化字符串输出 Info 级别日志
#[macro_export]
macro_rules! infof {
    ($($arg:tt)+) => {
        $crate::infof(::std::format_args!($($arg)+))
    };
}

/// 在全局日志器上以格式化字符串输出 Warn 级别日志
#[macro_export]
macro_rules! warnf {
    ($($arg:tt)+) => {
        $crate::warnf(::std::format_args!($($arg)+))
    };
}

/// 在全局日志器上以格式化字符串输出 Error 级别日志
#[macro_export]
macro_rules! errorf {
    ($($arg:tt)+) => {
        $crate::errorf(::std::format_args!($($arg)+))
    };
}

/// 在全局日志器上以格式化字符串输出 DPanic 级别日志
#[macro_export]
macro_rules! dpanicf {
    ($($arg:tt)+) => {
        $crate::dpanicf(::std::format_args!($($arg)+))
    };
}

/// 在全局日志器上以格式化字符串输出 Panic 级别日志
#[macro_export]
macro_rules! panicf {
    ($($arg:tt)+) => {
        $crate::panicf(::std::format_args!($($arg)+))
    };
}

/// 在全局日志器上以格式化字符串输出 Fatal 级别日志
#[macro_export]
macro_rules! fatalf {
    ($($arg:tt)+) => {
        $crate::fatalf(::std::format_args!($($arg)+))
    };
}

//! 定义 StrataLog 日志框架的所有配置结构体。
//!
//! 配置沿用键值配置源的布局：
//!
//! ```toml
//! svc_name = "billing"
//!
//! [log]
//! level = "info"
//! multi_staging = true
//!
//! [log.rotate]
//! info_log_path = "logs/info.log"
//! warn_log_path = "logs/warn.log"
//! all_log_path = "logs/all.log"
//! max_size = 100
//! max_backups = 7
//! max_age = 30
//! compress = true
//! ```

use crate::core::level::{rank_of, Rank};
use crate::error::{Result, StrataLogError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// --- 辅助函数，用于提供配置项的默认值 ---
fn default_level() -> String {
    "info".to_string()
}
fn default_false() -> bool {
    false
}
fn default_info_log_path() -> PathBuf {
    PathBuf::from("logs/info.log")
}
fn default_warn_log_path() -> PathBuf {
    PathBuf::from("logs/warn.log")
}
fn default_all_log_path() -> PathBuf {
    PathBuf::from("logs/all.log")
}
fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE_MB
}

/// 未配置（或配置为 0）时的单文件大小上限，单位 MB。
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// StrataLog 的顶层配置，对应整个配置文档。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StrataLogConfig {
    /// 写入每条记录 `serviceName` 字段的服务名
    #[serde(default, rename = "svc_name")]
    pub service_name: String,
    #[serde(default)]
    pub log: LogConfig,
}

/// `log` 配置段。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// 全局最低级别名称，未知名称按 `info` 处理
    #[serde(default = "default_level")]
    pub level: String,
    /// 启用多路输出（info/warn 分文件）
    #[serde(default = "default_false")]
    pub multi_staging: bool,
    /// 开发模式下 DPanic 级别会触发 panic
    #[serde(default = "default_false")]
    pub development: bool,
    /// 控制台输出是否为级别着色
    #[serde(default = "default_false")]
    pub console_color: bool,
    #[serde(default)]
    pub rotate: RotateConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            multi_staging: default_false(),
            development: default_false(),
            console_color: default_false(),
            rotate: RotateConfig::default(),
        }
    }
}

impl LogConfig {
    /// 全局阈值
    pub fn threshold(&self) -> Rank {
        rank_of(&self.level)
    }

    /// 配置的级别名称是否为规范名称
    pub fn level_is_canonical(&self) -> bool {
        Rank::ALL.iter().any(|r| r.name() == self.level)
    }
}

/// 日志文件轮转配置（`log.rotate` 配置段）。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RotateConfig {
    #[serde(default = "default_info_log_path")]
    pub info_log_path: PathBuf,
    #[serde(default = "default_warn_log_path")]
    pub warn_log_path: PathBuf,
    #[serde(default = "default_all_log_path")]
    pub all_log_path: PathBuf,
    /// 单文件大小上限（MB），0 表示默认值
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// 保留的备份数量，0 表示不限
    #[serde(default)]
    pub max_backups: usize,
    /// 备份保留天数，0 表示不限
    #[serde(default)]
    pub max_age: u64,
    #[serde(default = "default_false")]
    pub compress: bool,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            info_log_path: default_info_log_path(),
            warn_log_path: default_warn_log_path(),
            all_log_path: default_all_log_path(),
            max_size: default_max_size(),
            max_backups: 0,
            max_age: 0,
            compress: default_false(),
        }
    }
}

/// 日志文件分层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileTier {
    /// `level <= Info` 的记录
    Info,
    /// `level > Info` 的记录
    Warn,
    /// 单路输出模式下的汇总文件
    All,
}

impl FileTier {
    pub fn as_str(self) -> &'static str {
        match self {
            FileTier::Info => "info",
            FileTier::Warn => "warn",
            FileTier::All => "all",
        }
    }
}

impl RotateConfig {
    /// 为指定分层生成独占的文件 Sink 配置
    pub fn sink_config(&self, tier: FileTier) -> SinkConfig {
        let path = match tier {
            FileTier::Info => self.info_log_path.clone(),
            FileTier::Warn => self.warn_log_path.clone(),
            FileTier::All => self.all_log_path.clone(),
        };
        SinkConfig {
            path,
            max_size_mb: self.max_size,
            max_backups: self.max_backups,
            max_age_days: self.max_age,
            compress: self.compress,
        }
    }
}

/// 单个滚动文件 Sink 的配置，由该 Sink 独占。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub path: PathBuf,
    pub max_size_mb: u64,
    pub max_backups: usize,
    pub max_age_days: u64,
    pub compress: bool,
}

impl SinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
        }
    }

    /// 单文件大小上限（字节），超出 u64 范围时取 `u64::MAX`
    pub fn max_size_bytes(&self) -> u64 {
        self.effective_max_size_mb().saturating_mul(BYTES_PER_MB)
    }

    /// 配置的大小上限换算成字节后是否溢出
    pub fn max_size_overflows(&self) -> bool {
        self.effective_max_size_mb().checked_mul(BYTES_PER_MB).is_none()
    }

    fn effective_max_size_mb(&self) -> u64 {
        if self.max_size_mb == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            self.max_size_mb
        }
    }
}

impl StrataLogConfig {
    /// 从键值配置源读取配置，缺失的键使用默认值。
    pub fn from_source(source: &::config::Config) -> Result<Self> {
        let config = source.clone().try_deserialize::<StrataLogConfig>()?;
        Ok(config)
    }
}

/// 用于从配置文件加载 `StrataLogConfig` 的辅助函数。
///
/// 文件格式由扩展名决定（toml、yaml、json 等）。
pub fn load_config_from_file(path: &Path) -> Result<StrataLogConfig> {
    if !path.exists() {
        return Err(StrataLogError::ConfigFileMissing(
            path.to_string_lossy().into_owned(),
        ));
    }
    if path.is_dir() {
        return Err(StrataLogError::config(format!(
            "'{}' is a directory, not a normal file",
            path.display()
        )));
    }

    let source = ::config::Config::builder()
        .add_source(::config::File::from(path))
        .build()?;
    StrataLogConfig::from_source(&source)
}

/// 用于从 TOML 字符串加载 `StrataLogConfig` 的辅助函数。
pub fn load_config_from_str(config_str: &str) -> Result<StrataLogConfig> {
    let config: StrataLogConfig = toml::from_str(config_str)
        .map_err(|e| StrataLogError::ConfigError(format!("TOML解析失败: {}", e)))?;
    Ok(config)
}

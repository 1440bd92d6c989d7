//! 文件 Sink 通用功能
//!
//! 此模块提供滚动文件 sink 的备份管理：备份文件命名与识别、按数量和期限清理、
//! gzip 压缩，以及在后台线程上执行这些工作的 mill 工作线程。

use crate::diagnostics::Diagnostics;
use crate::error::{Result, StrataLogError};
use crate::utils::FileTools;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// 备份文件名中的时间戳格式（UTC，毫秒精度）
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// 压缩备份的扩展名
pub const COMPRESS_SUFFIX: &str = ".gz";

/// 备份文件命名器
///
/// 活动文件 `dir/app.log` 的备份命名为 `dir/app-<时间戳>.log`，
/// 压缩后再追加 `.gz`。
#[derive(Debug, Clone)]
pub struct BackupNamer {
    dir: PathBuf,
    stem: String,
    /// 带前导点的扩展名，没有扩展名时为空
    ext: String,
}

/// 目录中识别出的一个备份文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub compressed: bool,
}

impl BackupNamer {
    pub fn new(active: &Path) -> Self {
        let dir = match active.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = active
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "strata".to_string());
        let ext = active
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self { dir, stem, ext }
    }

    /// 指定时间戳对应的（未压缩）备份路径
    pub fn backup_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!(
            "{}-{}{}",
            self.stem,
            timestamp.format(BACKUP_TIME_FORMAT),
            self.ext
        ))
    }

    /// 生成一个尚未被占用的备份路径
    ///
    /// 同一毫秒内多次轮转时，时间戳向后推 1ms 直到不冲突。
    pub fn next_backup_path(&self, now: DateTime<Utc>) -> PathBuf {
        let mut timestamp = now;
        loop {
            let candidate = self.backup_path(timestamp);
            let compressed = with_compress_suffix(&candidate);
            if !candidate.exists() && !compressed.exists() {
                return candidate;
            }
            timestamp += Duration::milliseconds(1);
        }
    }

    /// 从文件名解析备份时间戳，不是本文件的备份时返回 `None`
    pub fn parse_backup_name(&self, file_name: &str) -> Option<(DateTime<Utc>, bool)> {
        let (name, compressed) = match file_name.strip_suffix(COMPRESS_SUFFIX) {
            Some(name) => (name, true),
            None => (file_name, false),
        };
        let middle = name
            .strip_prefix(self.stem.as_str())?
            .strip_prefix('-')?
            .strip_suffix(self.ext.as_str())?;
        let naive = NaiveDateTime::parse_from_str(middle, BACKUP_TIME_FORMAT).ok()?;
        Some((naive.and_utc(), compressed))
    }

    /// 列出目录中属于本文件的所有备份，按时间从新到旧排序
    pub fn list_backups(&self) -> Result<Vec<BackupFile>> {
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some((timestamp, compressed)) = self.parse_backup_name(file_name) {
                backups.push(BackupFile {
                    path: entry.path(),
                    timestamp,
                    compressed,
                });
            }
        }
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }
}

fn with_compress_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(COMPRESS_SUFFIX);
    PathBuf::from(name)
}

/// 把 `src` 压缩为 `dst`，成功后删除 `src`
///
/// 压缩失败时删除不完整的 `dst`，`src` 保持不变。
pub fn compress_file(src: &Path, dst: &Path) -> Result<()> {
    let result = (|| -> io::Result<()> {
        let mut reader = BufReader::new(File::open(src)?);
        let output = File::create(dst)?;
        let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = FileTools::remove_file_safe(dst);
        return Err(StrataLogError::rotation(format!(
            "压缩 {} 失败: {}",
            src.display(),
            e
        )));
    }

    FileTools::remove_file_safe(src)
}

/// 一次清理的结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub compressed: usize,
}

/// 备份清理器
///
/// 保留最新的 `max_backups` 份备份（0 表示不限），删除早于 `max_age_days`
/// 天的备份（0 表示不限），并在启用压缩时压缩剩余的未压缩备份。
#[derive(Debug, Clone)]
pub struct BackupCleaner {
    namer: BackupNamer,
    max_backups: usize,
    max_age_days: u64,
    compress: bool,
}

impl BackupCleaner {
    pub fn new(namer: BackupNamer) -> Self {
        Self {
            namer,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
        }
    }

    /// 设置最大备份数量
    pub fn max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    /// 设置最大保留天数
    pub fn max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// 是否需要任何清理工作
    pub fn is_active(&self) -> bool {
        self.max_backups > 0 || self.max_age_days > 0 || self.compress
    }

    /// 执行一次清理
    pub fn cleanup(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        let cutoff = (self.max_age_days > 0).then(|| {
            now - Duration::days(self.max_age_days.min(i64::MAX as u64 / 86_400) as i64)
        });

        // 同一时间戳的压缩与未压缩文件只算一份
        let mut groups: Vec<Vec<BackupFile>> = Vec::new();
        for backup in self.namer.list_backups()? {
            match groups.last_mut() {
                Some(group) if group[0].timestamp == backup.timestamp => group.push(backup),
                _ => groups.push(vec![backup]),
            }
        }

        let mut remaining = Vec::new();
        for (index, group) in groups.into_iter().enumerate() {
            let over_count = self.max_backups > 0 && index >= self.max_backups;
            let expired = cutoff.map(|c| group[0].timestamp < c).unwrap_or(false);

            if !(over_count || expired) {
                remaining.extend(group);
                continue;
            }

            for backup in group {
                match FileTools::remove_file_safe(&backup.path) {
                    Ok(()) => {
                        report.removed += 1;
                        tracing::debug!("Removed old log backup: {}", backup.path.display());
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to remove old log backup {}: {}",
                            backup.path.display(),
                            e
                        );
                    }
                }
            }
        }

        if self.compress {
            for backup in remaining.iter().filter(|b| !b.compressed) {
                let dst = with_compress_suffix(&backup.path);
                match compress_file(&backup.path, &dst) {
                    Ok(()) => {
                        report.compressed += 1;
                        tracing::debug!("Compressed log backup: {}", dst.display());
                    }
                    Err(e) => tracing::warn!("{}", e),
                }
            }
        }

        Ok(report)
    }
}

/// 后台清理线程
///
/// 写入路径只负责发送请求；清理、压缩都在这个线程上完成。
#[derive(Debug)]
pub struct MillWorker {
    sender: Option<mpsc::UnboundedSender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MillWorker {
    /// 启动清理线程
    pub fn spawn(cleaner: BackupCleaner, diagnostics: Arc<Diagnostics>) -> Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<()>();
        let handle = std::thread::Builder::new()
            .name("strata-log-mill".to_string())
            .spawn(move || {
                while receiver.blocking_recv().is_some() {
                    // 合并积压的请求
                    while receiver.try_recv().is_ok() {}

                    match cleaner.cleanup(Utc::now()) {
                        Ok(report) => {
                            diagnostics.add_backups_removed(report.removed as u64);
                            for _ in 0..report.compressed {
                                diagnostics.increment_backups_compressed();
                            }
                        }
                        Err(e) => {
                            eprintln!("strata_log: 备份清理失败: {}", e);
                        }
                    }
                }
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// 请求一次清理，不等待其完成
    pub fn request(&self) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(());
        }
    }

    /// 处理完已排队的请求后结束线程
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                eprintln!("strata_log: 备份清理线程异常退出");
            }
        }
    }
}

impl Drop for MillWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

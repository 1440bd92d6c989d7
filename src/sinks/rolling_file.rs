//! 滚动文件 Sink 实现
//!
//! 按大小滚动的日志文件。活动文件写满后被重命名为带时间戳的备份，
//! 备份的清理和压缩交给后台 mill 线程，不阻塞写入。

use crate::config::SinkConfig;
use crate::diagnostics::Diagnostics;
use crate::sinks::file_common::{BackupCleaner, BackupNamer, MillWorker};
use crate::sinks::traits::{LogSink, SinkError, SinkResult};
use crate::utils::FileTools;

use chrono::Utc;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// 活动文件状态，由互斥锁保护
#[derive(Debug, Default)]
struct ActiveFile {
    file: Option<File>,
    size: u64,
    closed: bool,
    mill: Option<MillWorker>,
}

/// 滚动文件 Sink
///
/// 文件在第一次写入时才打开（追加模式）。检查大小、轮转和写入在同一把锁内完成，
/// 单次写入要么完整落在轮转前的文件，要么完整落在轮转后的文件。
#[derive(Debug)]
pub struct RollingFileSink {
    name: String,
    config: SinkConfig,
    max_size: u64,
    namer: BackupNamer,
    cleaner: BackupCleaner,
    state: Mutex<ActiveFile>,
    diagnostics: Arc<Diagnostics>,
}

impl RollingFileSink {
    /// 创建新的滚动文件 Sink
    pub fn new(config: SinkConfig, diagnostics: Arc<Diagnostics>) -> Self {
        let namer = BackupNamer::new(&config.path);
        let cleaner = BackupCleaner::new(namer.clone())
            .max_backups(config.max_backups)
            .max_age_days(config.max_age_days)
            .compress(config.compress);

        Self {
            name: format!("file:{}", config.path.display()),
            max_size: config.max_size_bytes(),
            config,
            namer,
            cleaner,
            state: Mutex::new(ActiveFile::default()),
            diagnostics,
        }
    }

    /// 活动文件路径
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// 活动文件当前大小（不含备份）
    pub fn current_size(&self) -> u64 {
        self.lock().size
    }

    /// 立即轮转：关闭当前文件，重命名为备份并打开新的活动文件
    pub fn rotate(&self) -> SinkResult<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(SinkError::Closed);
        }
        self.rotate_locked(&mut state)
    }

    fn lock(&self) -> MutexGuard<'_, ActiveFile> {
        // 写入失败不会留下不一致的状态，中毒的锁可以继续使用
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 打开已存在的活动文件；放不下这次写入时先轮转
    fn open_existing_or_new(&self, state: &mut ActiveFile, write_len: u64) -> SinkResult<()> {
        match FileTools::file_size(&self.config.path) {
            Some(size) if size + write_len >= self.max_size => return self.rotate_locked(state),
            Some(size) => {
                let file = FileTools::open_file_append(&self.config.path)?;
                state.file = Some(file);
                state.size = size;
            }
            None => self.open_new(state)?,
        }
        debug!("Opened log file {}", self.config.path.display());
        // 清理上次运行留下的备份
        self.request_mill(state);
        Ok(())
    }

    fn open_new(&self, state: &mut ActiveFile) -> SinkResult<()> {
        let file = FileTools::open_file_append(&self.config.path)?;
        state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
        state.file = Some(file);
        Ok(())
    }

    /// 把活动文件重命名为备份，返回是否发生了重命名
    fn archive_active_file(&self, state: &mut ActiveFile) -> std::io::Result<bool> {
        if let Some(file) = state.file.as_mut() {
            file.flush()?;
        }
        if !self.config.path.exists() {
            return Ok(false);
        }
        let backup = self.namer.next_backup_path(Utc::now());
        fs::rename(&self.config.path, &backup)?;
        debug!(
            "Rotated {} to {}",
            self.config.path.display(),
            backup.display()
        );
        Ok(true)
    }

    fn rotate_locked(&self, state: &mut ActiveFile) -> SinkResult<()> {
        let renamed = match self.archive_active_file(state) {
            Ok(renamed) => renamed,
            Err(e) => {
                self.diagnostics.increment_rotation_failures();
                eprintln!(
                    "strata_log: 重命名 {} 失败，继续写入当前文件: {}",
                    self.config.path.display(),
                    e
                );
                if state.file.is_some() {
                    return Ok(());
                }
                false
            }
        };

        if let Err(e) = self.open_new(state) {
            self.diagnostics.increment_rotation_failures();
            eprintln!(
                "strata_log: 重新打开 {} 失败: {}",
                self.config.path.display(),
                e
            );
            // 保留已重命名的句柄继续写入
            if state.file.is_none() {
                return Err(SinkError::Rotation(e.to_string()));
            }
        }

        if renamed {
            self.diagnostics.increment_rotations();
            self.request_mill(state);
        }
        Ok(())
    }

    fn request_mill(&self, state: &mut ActiveFile) {
        if !self.cleaner.is_active() {
            return;
        }
        if state.mill.is_none() {
            match MillWorker::spawn(self.cleaner.clone(), self.diagnostics.clone()) {
                Ok(worker) => state.mill = Some(worker),
                Err(e) => {
                    eprintln!("strata_log: 无法启动备份清理线程: {}", e);
                    return;
                }
            }
        }
        if let Some(mill) = &state.mill {
            mill.request();
        }
    }
}

impl LogSink for RollingFileSink {
    fn write(&self, bytes: &[u8]) -> SinkResult<usize> {
        let len = bytes.len() as u64;
        if len > self.max_size {
            return Err(SinkError::TooLarge {
                len: bytes.len(),
                max: self.max_size,
            });
        }

        let mut state = self.lock();
        if state.closed {
            return Err(SinkError::Closed);
        }

        if state.file.is_none() {
            self.open_existing_or_new(&mut state, len)?;
        } else if state.size + len > self.max_size {
            self.rotate_locked(&mut state)?;
        }

        let file = state.file.as_mut().ok_or(SinkError::Closed)?;
        file.write_all(bytes)?;
        state.size += len;
        Ok(bytes.len())
    }

    fn sync(&self) -> SinkResult<()> {
        let mut state = self.lock();
        if let Some(file) = state.file.as_mut() {
            file.flush()?;
            file.sync_data()?;
        }
        Ok(())
    }

    fn close(&self) -> SinkResult<()> {
        let (file, mill) = {
            let mut state = self.lock();
            state.closed = true;
            (state.file.take(), state.mill.take())
        };

        let result = match file {
            Some(mut file) => file.flush().and_then(|_| file.sync_data()),
            None => Ok(()),
        };

        // 等待已排队的清理完成
        if let Some(mut mill) = mill {
            mill.shutdown();
        }

        result.map_err(SinkError::from)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RollingFileSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sink_config(dir: &TempDir) -> SinkConfig {
        SinkConfig::new(dir.path().join("app.log"))
    }

    /// 以字节为单位的上限（仅测试用）
    fn small_sink(config: SinkConfig, max_size: u64) -> RollingFileSink {
        let mut sink = RollingFileSink::new(config, Arc::new(Diagnostics::new()));
        sink.max_size = max_size;
        sink
    }

    fn backups(sink: &RollingFileSink) -> Vec<PathBuf> {
        sink.namer
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|b| b.path)
            .collect()
    }

    #[test]
    fn test_rolling_file_sink_creation_is_lazy() {
        let temp_dir = TempDir::new().unwrap();
        let sink = RollingFileSink::new(sink_config(&temp_dir), Arc::new(Diagnostics::new()));
        assert!(!sink.path().exists());
        assert_eq!(sink.current_size(), 0);
        assert!(sink.name().starts_with("file:"));

        sink.write(b"hello\n").unwrap();
        assert!(sink.path().exists());
        assert_eq!(sink.current_size(), 6);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = sink_config(&temp_dir);
        fs::write(&config.path, b"previous\n").unwrap();

        let sink = small_sink(config, 1024);
        sink.write(b"next\n").unwrap();
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "previous\nnext\n");
        assert_eq!(sink.current_size(), 14);
        assert!(backups(&sink).is_empty());
    }

    #[test]
    fn test_rotates_existing_file_when_full() {
        let temp_dir = TempDir::new().unwrap();
        let config = sink_config(&temp_dir);
        fs::write(&config.path, vec![b'a'; 95]).unwrap();

        let sink = small_sink(config, 100);
        sink.write(b"12345").unwrap();

        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "12345");
        assert_eq!(backups(&sink).len(), 1);
    }

    #[test]
    fn test_rotation_preserves_every_byte() {
        let temp_dir = TempDir::new().unwrap();
        let sink = small_sink(sink_config(&temp_dir), 100);

        let mut expected = String::new();
        for i in 0..30 {
            let line = format!("line-{:03}\n", i);
            expected.push_str(&line);
            sink.write(line.as_bytes()).unwrap();
            assert!(sink.current_size() <= 100);
        }

        let mut all = String::new();
        let mut files = backups(&sink);
        files.reverse();
        for backup in files {
            all.push_str(&fs::read_to_string(backup).unwrap());
        }
        all.push_str(&fs::read_to_string(sink.path()).unwrap());
        assert_eq!(all, expected);
        assert!(sink.diagnostics.snapshot().rotations >= 2);
    }

    #[test]
    fn test_write_larger_than_max_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let sink = small_sink(sink_config(&temp_dir), 10);
        let err = sink.write(&[b'x'; 11]).unwrap_err();
        assert!(matches!(err, SinkError::TooLarge { len: 11, max: 10 }));
        assert!(!sink.path().exists());
    }

    #[test]
    fn test_explicit_rotate() {
        let temp_dir = TempDir::new().unwrap();
        let sink = small_sink(sink_config(&temp_dir), 1024);
        sink.write(b"before\n").unwrap();
        sink.rotate().unwrap();
        sink.write(b"after\n").unwrap();

        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "after\n");
        let files = backups(&sink);
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "before\n");
    }

    #[test]
    fn test_prunes_to_max_backups() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = sink_config(&temp_dir);
        config.max_backups = 2;
        let sink = small_sink(config, 1024);

        for i in 0..5 {
            sink.write(format!("generation {}\n", i).as_bytes()).unwrap();
            sink.rotate().unwrap();
        }
        sink.close().unwrap();

        assert_eq!(backups(&sink).len(), 2);
        assert_eq!(sink.diagnostics.snapshot().backups_removed, 3);
    }

    #[test]
    fn test_compresses_backups() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = sink_config(&temp_dir);
        config.compress = true;
        let sink = small_sink(config, 1024);

        sink.write(b"compress me\n").unwrap();
        sink.rotate().unwrap();
        sink.write(b"active\n").unwrap();
        assert_eq!(sink.current_size(), 7);
        sink.close().unwrap();

        let files = sink.namer.list_backups().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].compressed);
        assert!(files[0].path.to_string_lossy().ends_with(".log.gz"));

        let mut decoder = flate2::read::GzDecoder::new(File::open(&files[0].path).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text, "compress me\n");
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "active\n");
    }

    #[test]
    fn test_closed_sink_rejects_writes() {
        let temp_dir = TempDir::new().unwrap();
        let sink = small_sink(sink_config(&temp_dir), 1024);
        sink.write(b"x\n").unwrap();
        sink.close().unwrap();
        assert!(matches!(sink.write(b"y\n"), Err(SinkError::Closed)));
        assert!(matches!(sink.rotate(), Err(SinkError::Closed)));
        // 重复关闭
        assert!(sink.close().is_ok());
    }

    #[test]
    fn test_concurrent_writes_do_not_interleave() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(small_sink(sink_config(&temp_dir), 4096));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let line = format!("thread-{}-record-{:02}\n", t, i);
                        sink.write(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        sink.sync().unwrap();

        let mut lines = 0;
        let mut files = backups(&sink);
        files.push(sink.path().to_path_buf());
        for file in files {
            for line in fs::read_to_string(file).unwrap().lines() {
                assert!(line.starts_with("thread-") && line.len() == "thread-0-record-00".len());
                lines += 1;
            }
        }
        assert_eq!(lines, 200);
    }
}

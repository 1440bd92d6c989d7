//! 定义 StrataLog 日志框架的内部诊断与指标。
//!
//! Sink 写入失败不会传播给调用方，而是记录在这里，作为旁路通道供运维查询。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 内部诊断与指标数据结构。
///
/// 使用原子操作确保线程安全。每个 `Logger` 拥有一个实例，
/// 与其路由器和滚动文件 Sink 共享。
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// 系统启动时间
    start_time: Option<Instant>,

    /// 至少被一个 Sink 接收的记录数
    records_routed: AtomicU64,

    /// 没有任何 Sink 接收的记录数
    records_suppressed: AtomicU64,

    /// 成功的 Sink 写入次数
    sink_writes: AtomicU64,

    /// Sink 写入错误次数
    sink_errors: AtomicU64,

    /// 文件轮转次数
    rotations: AtomicU64,

    /// 文件轮转失败次数
    rotation_failures: AtomicU64,

    /// 压缩完成的备份文件数
    backups_compressed: AtomicU64,

    /// 因数量或期限被清理的备份文件数
    backups_removed: AtomicU64,
}

/// 诊断数据的快照，用于外部查询。
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsSnapshot {
    pub uptime: Option<Duration>,
    pub records_routed: u64,
    pub records_suppressed: u64,
    pub sink_writes: u64,
    pub sink_errors: u64,
    pub rotations: u64,
    pub rotation_failures: u64,
    pub backups_compressed: u64,
    pub backups_removed: u64,
    /// 写入成功率（百分比）
    pub write_success_rate_percent: f64,
}

impl Diagnostics {
    /// 创建新的诊断实例。
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn increment_records_routed(&self) {
        self.records_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_suppressed(&self) {
        self.records_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sink_writes(&self) {
        self.sink_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sink_errors(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rotations(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rotation_failures(&self) {
        self.rotation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backups_compressed(&self) {
        self.backups_compressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_backups_removed(&self, count: u64) {
        self.backups_removed.fetch_add(count, Ordering::Relaxed);
    }

    /// 获取诊断数据的快照。
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let sink_writes = self.sink_writes.load(Ordering::Relaxed);
        let sink_errors = self.sink_errors.load(Ordering::Relaxed);

        let write_success_rate_percent = if sink_writes + sink_errors > 0 {
            (sink_writes as f64 / (sink_writes + sink_errors) as f64) * 100.0
        } else {
            100.0
        };

        DiagnosticsSnapshot {
            uptime: self.start_time.map(|start| start.elapsed()),
            records_routed: self.records_routed.load(Ordering::Relaxed),
            records_suppressed: self.records_suppressed.load(Ordering::Relaxed),
            sink_writes,
            sink_errors,
            rotations: self.rotations.load(Ordering::Relaxed),
            rotation_failures: self.rotation_failures.load(Ordering::Relaxed),
            backups_compressed: self.backups_compressed.load(Ordering::Relaxed),
            backups_removed: self.backups_removed.load(Ordering::Relaxed),
            write_success_rate_percent,
        }
    }

}

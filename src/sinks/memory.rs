//! 内存 Sink
//!
//! 把每条写入保存在内存中，供测试和嵌入方断言路由结果。
//! 可以通过 `set_failing` 模拟写入失败。

use crate::sinks::traits::{LogSink, SinkError, SinkResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 内存 Sink
#[derive(Debug, Default)]
pub struct MemorySink {
    name: String,
    entries: Mutex<Vec<Vec<u8>>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 之后的写入全部返回错误
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 已写入的记录（每次写入一条）
    pub fn entries(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|e| String::from_utf8_lossy(e).into_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 拼接后的全部内容
    pub fn contents(&self) -> String {
        self.entries().concat()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        // a poisoned buffer is still readable
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LogSink for MemorySink {
    fn write(&self, bytes: &[u8]) -> SinkResult<usize> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Generic(format!(
                "memory sink '{}' set to fail",
                self.name
            )));
        }
        self.lock().push(bytes.to_vec());
        Ok(bytes.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

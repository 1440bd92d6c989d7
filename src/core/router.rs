//! Sink 路由器
//!
//! 拓扑是有序的绑定列表，每个绑定把一个 sink 和级别谓词、编码形态配成一对。
//! 路由时记录被分发给所有接受该级别的绑定，单个 sink 失败不影响其他 sink。

use crate::core::encoder::{EncoderProfile, EncoderShape};
use crate::core::level::Rank;
use crate::core::record::LogRecord;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, StrataLogError};
use crate::sinks::traits::{LogSink, SinkResult};
use std::sync::Arc;

/// 判断绑定是否接受某个级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelPredicate {
    /// `rank >= threshold`
    AtLeast(Rank),
    /// `rank <= Info && rank > floor`
    InfoTierOnly { floor: Rank },
    /// `rank > Info && rank > floor`
    WarnTierOnly { floor: Rank },
}

impl LevelPredicate {
    pub fn accepts(&self, rank: Rank) -> bool {
        match *self {
            LevelPredicate::AtLeast(threshold) => rank >= threshold,
            LevelPredicate::InfoTierOnly { floor } => rank <= Rank::Info && rank > floor,
            LevelPredicate::WarnTierOnly { floor } => rank > Rank::Info && rank > floor,
        }
    }
}

/// sink 及其使用的谓词和编码形态
#[derive(Debug, Clone)]
pub struct Binding {
    name: String,
    predicate: LevelPredicate,
    shape: EncoderShape,
    sink: Arc<dyn LogSink>,
}

impl Binding {
    pub fn new(
        name: impl Into<String>,
        predicate: LevelPredicate,
        shape: EncoderShape,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            name: name.into(),
            predicate,
            shape,
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicate(&self) -> LevelPredicate {
        self.predicate
    }

    pub fn shape(&self) -> EncoderShape {
        self.shape
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }
}

/// 不可变的绑定集合，以及它们共享的编码器
#[derive(Debug, Default)]
pub struct RouterTopology {
    bindings: Vec<Binding>,
    encoder: EncoderProfile,
}

impl RouterTopology {
    pub fn new(bindings: Vec<Binding>, encoder: EncoderProfile) -> Self {
        Self { bindings, encoder }
    }

    /// 不接受任何记录的拓扑
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn encoder(&self) -> &EncoderProfile {
        &self.encoder
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// 按绑定顺序列出各个不同的 sink，每个只出现一次
    fn distinct_sinks(&self) -> Vec<(&str, &Arc<dyn LogSink>)> {
        let mut seen: Vec<*const ()> = Vec::with_capacity(self.bindings.len());
        let mut sinks = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let ptr = Arc::as_ptr(&binding.sink) as *const ();
            if !seen.contains(&ptr) {
                seen.push(ptr);
                sinks.push((binding.name.as_str(), &binding.sink));
            }
        }
        sinks
    }
}

/// 一次 `route` 调用的结果计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// 接受并写入成功的绑定数
    pub delivered: usize,
    /// 接受了记录但写入失败的绑定数
    pub failed: usize,
}

impl RouteOutcome {
    /// 没有任何绑定接受该记录
    pub fn is_suppressed(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

/// 按拓扑路由记录，并把结果计入诊断信息
#[derive(Debug, Clone)]
pub struct SinkRouter {
    topology: Arc<RouterTopology>,
    diagnostics: Arc<Diagnostics>,
}

impl SinkRouter {
    pub fn new(topology: Arc<RouterTopology>, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            topology,
            diagnostics,
        }
    }

    pub fn topology(&self) -> &Arc<RouterTopology> {
        &self.topology
    }

    /// 是否有绑定接受 `rank`
    pub fn enabled(&self, rank: Rank) -> bool {
        self.topology
            .bindings
            .iter()
            .any(|b| b.predicate.accepts(rank))
    }

    /// 把记录写入所有接受它的绑定
    ///
    /// 每条记录的每种形态最多编码一次。
    pub fn route(&self, record: &LogRecord) -> RouteOutcome {
        let mut outcome = RouteOutcome::default();
        let mut console: Option<Vec<u8>> = None;
        let mut json: Option<Vec<u8>> = None;

        for binding in &self.topology.bindings {
            if !binding.predicate.accepts(record.rank()) {
                continue;
            }

            let encoder = &self.topology.encoder;
            let bytes = match binding.shape {
                EncoderShape::Console => console
                    .get_or_insert_with(|| encoder.encode(record, EncoderShape::Console)),
                EncoderShape::Json => {
                    json.get_or_insert_with(|| encoder.encode(record, EncoderShape::Json))
                }
            };

            match binding.sink.write(bytes) {
                Ok(_) => {
                    self.diagnostics.increment_sink_writes();
                    outcome.delivered += 1;
                }
                Err(e) => {
                    self.diagnostics.increment_sink_errors();
                    outcome.failed += 1;
                    eprintln!("strata_log: sink '{}' write failed: {}", binding.name, e);
                }
            }
        }

        if outcome.is_suppressed() {
            self.diagnostics.increment_records_suppressed();
        } else {
            self.diagnostics.increment_records_routed();
        }
        outcome
    }

    /// 刷新所有 sink
    pub fn sync(&self) -> Result<()> {
        self.for_each_sink("sync", |sink| sink.sync())
    }

    /// 关闭所有 sink，并等待后台任务结束
    pub fn close(&self) -> Result<()> {
        self.for_each_sink("close", |sink| sink.close())
    }

    fn for_each_sink<F>(&self, op: &str, f: F) -> Result<()>
    where
        F: Fn(&dyn LogSink) -> SinkResult<()>,
    {
        let mut failures = Vec::new();
        for (name, sink) in self.topology.distinct_sinks() {
            if let Err(e) = f(sink.as_ref()) {
                self.diagnostics.increment_sink_errors();
                failures.push(format!("{}: {}", name, e));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(StrataLogError::sink(format!(
                "{} failed for {}",
                op,
                failures.join("; ")
            )))
        }
    }
}

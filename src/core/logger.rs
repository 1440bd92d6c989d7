//! 日志门面
//!
//! [`Logger`] 是共享路由器之上的轻量句柄，克隆开销很小。发射在调用方线程上同步完成：
//! 填充记录、路由，终止级别随后触发 panic 或退出进程。

use crate::config::StrataLogConfig;
use crate::core::level::Rank;
use crate::core::record::{Caller, LogRecord};
use crate::core::router::{RouteOutcome, RouterTopology, SinkRouter};
use crate::core::topology::{build_topology, console_topology, TopologyReport};
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::error::Result;
use serde_json::Value;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Fatal 记录刷新后以退出码调用
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// 进程级服务标签的键名
pub const SERVICE_NAME_KEY: &str = "serviceName";

/// 作用于日志器所有记录的设置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggerOptions {
    /// 为 true 时 `DPanic` 记录在路由后触发 panic
    pub development: bool,
    /// 每条记录都带的字段，排在子日志器字段和调用字段之前
    pub tags: Vec<(String, Value)>,
}

impl LoggerOptions {
    pub fn from_config(config: &StrataLogConfig) -> Self {
        Self {
            development: config.log.development,
            tags: vec![(
                SERVICE_NAME_KEY.to_string(),
                Value::from(config.service_name.as_str()),
            )],
        }
    }
}

/// 一次发射同时看到的路由器和选项
#[derive(Debug)]
struct LoggerState {
    router: SinkRouter,
    options: Arc<LoggerOptions>,
}

struct LoggerShared {
    state: RwLock<Arc<LoggerState>>,
    diagnostics: Arc<Diagnostics>,
    exit_hook: RwLock<ExitHook>,
}

impl fmt::Debug for LoggerShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerShared")
            .field("state", &self.state)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

/// 发射日志记录的句柄
///
/// 克隆共享同一个路由器；[`Logger::named`] 和 [`Logger::with`] 派生出的子日志器
/// 会给输出的每条记录加上名称或字段。
#[derive(Debug, Clone)]
pub struct Logger {
    shared: Arc<LoggerShared>,
    name: Option<Arc<str>>,
    fields: Arc<Vec<(String, Value)>>,
}

macro_rules! emit_methods {
    ($($rank:ident => $plain:ident, $formatted:ident, $keyed:ident;)*) => {
        $(
            #[doc = concat!("输出 `", stringify!($rank), "` 级别记录，位置参数以空格连接")]
            #[track_caller]
            pub fn $plain(&self, args: &[&dyn fmt::Display]) {
                self.emit(Rank::$rank, || join_args(args), &[]);
            }

            #[doc = concat!("以格式化参数输出 `", stringify!($rank), "` 级别记录")]
            #[track_caller]
            pub fn $formatted(&self, args: fmt::Arguments<'_>) {
                self.emit(Rank::$rank, || fmt::format(args), &[]);
            }

            #[doc = concat!("输出带键值字段的 `", stringify!($rank), "` 级别记录")]
            #[track_caller]
            pub fn $keyed(&self, msg: &str, fields: &[(&str, Value)]) {
                self.emit(Rank::$rank, || msg.to_string(), fields);
            }
        )*
    };
}

impl Logger {
    /// 使用默认选项在 `topology` 上创建日志器
    pub fn new(topology: RouterTopology) -> Self {
        Self::with_options(topology, LoggerOptions::default())
    }

    pub fn with_options(topology: RouterTopology, options: LoggerOptions) -> Self {
        let diagnostics = Arc::new(Diagnostics::new());
        Self::from_parts(topology, options, diagnostics)
    }

    fn from_parts(
        topology: RouterTopology,
        options: LoggerOptions,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        let state = LoggerState {
            router: SinkRouter::new(Arc::new(topology), diagnostics.clone()),
            options: Arc::new(options),
        };
        let exit_hook: ExitHook = Arc::new(|code| std::process::exit(code));
        Self {
            shared: Arc::new(LoggerShared {
                state: RwLock::new(Arc::new(state)),
                diagnostics,
                exit_hook: RwLock::new(exit_hook),
            }),
            name: None,
            fields: Arc::new(Vec::new()),
        }
    }

    /// 按配置构建拓扑并创建日志器
    pub fn from_config(config: &StrataLogConfig) -> (Self, TopologyReport) {
        let diagnostics = Arc::new(Diagnostics::new());
        let (topology, report) = build_topology(config.log.multi_staging, &config.log, &diagnostics);
        let logger = Self::from_parts(topology, LoggerOptions::from_config(config), diagnostics);
        info!(
            "Logger initialized: level={}, multi_staging={}",
            config.log.threshold(),
            config.log.multi_staging
        );
        (logger, report)
    }

    /// 初始化之前使用的 info 级别控制台日志器
    pub fn console_default() -> Self {
        Self::new(console_topology(Rank::Info, false))
    }

    fn state(&self) -> Arc<LoggerState> {
        // 锁内只做 Arc 替换，中毒后数据仍然可用
        self.shared
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 原子地换入新的拓扑，发射方看到的要么是完整的旧拓扑，要么是新拓扑
    ///
    /// 旧拓扑不会被主动关闭：仍在发射的调用持有它的引用，最后一个引用
    /// 释放时各 sink 在 `Drop` 中刷新并关闭。
    pub fn replace_topology(&self, topology: RouterTopology) {
        self.install(topology, None);
        info!("Logger topology replaced");
    }

    /// 按配置重建拓扑和选项
    pub fn reconfigure(&self, config: &StrataLogConfig) -> TopologyReport {
        let (topology, report) =
            build_topology(config.log.multi_staging, &config.log, &self.shared.diagnostics);
        self.install(topology, Some(LoggerOptions::from_config(config)));
        info!(
            "Logger reconfigured: level={}, multi_staging={}",
            config.log.threshold(),
            config.log.multi_staging
        );
        report
    }

    fn install(&self, topology: RouterTopology, options: Option<LoggerOptions>) {
        let previous = {
            let mut guard = self.shared.state.write().unwrap_or_else(|e| e.into_inner());
            let options = options.map(Arc::new).unwrap_or_else(|| guard.options.clone());
            let next = LoggerState {
                router: SinkRouter::new(Arc::new(topology), self.shared.diagnostics.clone()),
                options,
            };
            std::mem::replace(&mut *guard, Arc::new(next))
        };
        // 在锁外释放，关闭文件时可能要等待 mill 线程
        drop(previous);
    }

    /// 替换 Fatal 记录之后执行的钩子（默认为 `std::process::exit`）
    pub fn set_exit_hook<F>(&self, hook: F)
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        *self
            .shared
            .exit_hook
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Arc::new(hook);
    }

    /// 名称以点号追加的子日志器
    pub fn named(&self, name: &str) -> Self {
        let name: Arc<str> = match &self.name {
            Some(parent) if !name.is_empty() => format!("{}.{}", parent, name).into(),
            Some(parent) => parent.clone(),
            None => name.into(),
        };
        Self {
            shared: self.shared.clone(),
            name: Some(name),
            fields: self.fields.clone(),
        }
    }

    /// 为每条记录追加 `fields` 的子日志器
    pub fn with(&self, fields: &[(&str, Value)]) -> Self {
        let mut merged = Vec::with_capacity(self.fields.len() + fields.len());
        merged.extend(self.fields.iter().cloned());
        merged.extend(fields.iter().map(|(k, v)| (k.to_string(), v.clone())));
        Self {
            shared: self.shared.clone(),
            name: self.name.clone(),
            fields: Arc::new(merged),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `rank` 级别的记录是否会到达某个 sink
    pub fn enabled(&self, rank: Rank) -> bool {
        self.state().router.enabled(rank)
    }

    /// 刷新所有 sink
    pub fn sync(&self) -> Result<()> {
        self.state().router.sync()
    }

    /// 关闭所有 sink 并等待后台备份任务
    pub fn close(&self) -> Result<()> {
        self.state().router.close()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.shared.diagnostics.snapshot()
    }

    emit_methods! {
        Debug => debug, debugf, debugw;
        Info => info, infof, infow;
        Warn => warn, warnf, warnw;
        Error => error, errorf, errorw;
        DPanic => dpanic, dpanicf, dpanicw;
        Panic => panic, panicf, panicw;
        Fatal => fatal, fatalf, fatalw;
    }

    /// 以运行时决定的级别发射记录
    #[track_caller]
    pub fn log(&self, rank: Rank, msg: &str, fields: &[(&str, Value)]) {
        self.emit(rank, || msg.to_string(), fields);
    }

    /// 填充并路由在别处组装的记录，例如 tracing 事件
    ///
    /// 此路径上终止级别不会 panic 或退出。
    pub fn log_event(
        &self,
        rank: Rank,
        message: String,
        fields: Vec<(String, Value)>,
        caller: Option<Caller>,
    ) -> RouteOutcome {
        let state = self.state();
        if !state.router.enabled(rank) {
            self.shared.diagnostics.increment_records_suppressed();
            return RouteOutcome::default();
        }
        let mut record = self.stamp(LogRecord::new(rank, message), &state.options);
        if let Some(caller) = caller {
            record = record.with_caller(caller);
        }
        state.router.route(&record.with_fields(fields))
    }

    #[track_caller]
    fn emit<F>(&self, rank: Rank, message: F, fields: &[(&str, Value)])
    where
        F: FnOnce() -> String,
    {
        let caller = Caller::from(Location::caller());
        let state = self.state();
        let terminal = rank >= Rank::Panic || (rank == Rank::DPanic && state.options.development);

        let message = if state.router.enabled(rank) {
            let record = self
                .stamp(LogRecord::new(rank, message()), &state.options)
                .with_caller(caller)
                .with_fields(fields.iter().map(|(k, v)| (*k, v.clone())));
            state.router.route(&record);
            record.message().to_string()
        } else {
            self.shared.diagnostics.increment_records_suppressed();
            if !terminal {
                return;
            }
            message()
        };

        match rank {
            Rank::Fatal => {
                if let Err(e) = state.router.sync() {
                    eprintln!("strata_log: sync before exit failed: {}", e);
                }
                let hook = self
                    .shared
                    .exit_hook
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                hook(1);
            }
            Rank::Panic => panic!("{}", message),
            Rank::DPanic if terminal => panic!("{}", message),
            _ => {}
        }
    }

    /// 两条发射路径共用：填充名称、标签、子日志器字段和调用栈
    fn stamp(&self, record: LogRecord, options: &LoggerOptions) -> LogRecord {
        let rank = record.rank();
        let mut record = record
            .with_fields(options.tags.iter().cloned())
            .with_fields(self.fields.iter().cloned());
        if let Some(name) = &self.name {
            record = record.with_logger_name(name.as_ref());
        }
        if rank.wants_stacktrace() {
            record = record.with_stacktrace(Backtrace::force_capture().to_string());
        }
        record
    }
}

fn join_args(args: &[&dyn fmt::Display]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::{EncoderProfile, EncoderShape};
    use crate::core::router::{Binding, LevelPredicate};
    use crate::sinks::memory::MemorySink;
    use serde_json::json;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use crate::config::SinkConfig;
    use crate::sinks::rolling_file::RollingFileSink;
    use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
    use std::thread;
    use tempfile::TempDir;

    fn json_logger(threshold: Rank, options: LoggerOptions) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new("mem"));
        let topology = RouterTopology::new(
            vec![Binding::new(
                "mem",
                LevelPredicate::AtLeast(threshold),
                EncoderShape::Json,
                sink.clone(),
            )],
            EncoderProfile::new(),
        );
        (Logger::with_options(topology, options), sink)
    }

    fn parse(line: &str) -> Value {
        serde_json::from_str(line.trim_end()).unwrap()
    }

    #[test]
    fn test_positional_args_are_space_joined() {
        let (logger, sink) = json_logger(Rank::Debug, LoggerOptions::default());
        logger.info(&[&"user", &42, &true]);
        let line = parse(&sink.entries()[0]);
        assert_eq!(line["msg"], json!("user 42 true"));
        assert_eq!(line["level"], json!("INFO"));
    }

    #[test]
    fn test_formatted_and_keyed_shapes() {
        let (logger, sink) = json_logger(Rank::Debug, LoggerOptions::default());
        logger.debugf(format_args!("retry {} of {}", 2, 5));
        logger.infow("order placed", &[("order_id", json!(17)), ("paid", json!(true))]);

        let entries = sink.entries();
        assert_eq!(parse(&entries[0])["msg"], json!("retry 2 of 5"));
        let keyed = parse(&entries[1]);
        assert_eq!(keyed["order_id"], json!(17));
        assert_eq!(keyed["paid"], json!(true));
    }

    #[test]
    fn test_caller_is_the_emission_site() {
        let (logger, sink) = json_logger(Rank::Debug, LoggerOptions::default());
        let line = line!() + 1;
        logger.info(&[&"here"]);
        let caller = parse(&sink.entries()[0])["caller"].as_str().unwrap().to_string();
        assert!(caller.ends_with(&format!("logger.rs:{}", line)), "{}", caller);
    }

    #[test]
    fn test_tags_child_fields_and_names() {
        let options = LoggerOptions {
            tags: vec![(SERVICE_NAME_KEY.to_string(), json!("svc"))],
            ..Default::default()
        };
        let (logger, sink) = json_logger(Rank::Debug, options);
        let child = logger
            .named("api")
            .named("orders")
            .with(&[("request_id", json!("r-1"))]);
        child.infow("created", &[("id", json!(9))]);

        let line = parse(&sink.entries()[0]);
        assert_eq!(line["logger"], json!("api.orders"));
        assert_eq!(line["serviceName"], json!("svc"));
        assert_eq!(line["request_id"], json!("r-1"));
        assert_eq!(line["id"], json!(9));

        // 字段顺序：标签、子日志器字段、调用字段
        let raw = &sink.entries()[0];
        let svc = raw.find("serviceName").unwrap();
        let req = raw.find("request_id").unwrap();
        let id = raw.find("\"id\"").unwrap();
        assert!(svc < req && req < id);
    }

    #[test]
    fn test_stacktrace_only_from_warn() {
        let (logger, sink) = json_logger(Rank::Debug, LoggerOptions::default());
        logger.info(&[&"no trace"]);
        logger.warn(&[&"trace"]);
        let entries = sink.entries();
        assert!(parse(&entries[0]).get("stacktrace").is_none());
        assert!(parse(&entries[1]).get("stacktrace").is_some());
    }

    #[test]
    fn test_below_threshold_is_skipped() {
        let (logger, sink) = json_logger(Rank::Warn, LoggerOptions::default());
        logger.info(&[&"dropped"]);
        logger.error(&[&"kept"]);
        assert_eq!(sink.len(), 1);
        let snapshot = logger.diagnostics();
        assert_eq!(snapshot.records_suppressed, 1);
        assert_eq!(snapshot.records_routed, 1);
    }

    #[test]
    fn test_panic_routes_then_panics() {
        let (logger, sink) = json_logger(Rank::Debug, LoggerOptions::default());
        let result = catch_unwind(AssertUnwindSafe(|| logger.panic(&[&"bad state"])));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("bad state"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_panic_without_accepting_binding_still_panics() {
        let logger = Logger::new(RouterTopology::empty());
        let result = catch_unwind(AssertUnwindSafe(|| logger.panicf(format_args!("x={}", 1))));
        assert!(result.is_err());
    }

    #[test]
    fn test_dpanic_depends_on_development_mode() {
        let (logger, sink) = json_logger(Rank::Debug, LoggerOptions::default());
        logger.dpanic(&[&"tolerated"]);
        assert_eq!(sink.len(), 1);

        let options = LoggerOptions {
            development: true,
            ..Default::default()
        };
        let (dev, dev_sink) = json_logger(Rank::Debug, options);
        let result = catch_unwind(AssertUnwindSafe(|| dev.dpanic(&[&"strict"])));
        assert!(result.is_err());
        assert_eq!(dev_sink.len(), 1);
    }

    #[test]
    fn test_fatal_routes_syncs_and_exits() {
        let (logger, sink) = json_logger(Rank::Error, LoggerOptions::default());
        let code = Arc::new(AtomicI32::new(0));
        let seen = code.clone();
        logger.set_exit_hook(move |c| seen.store(c, Ordering::SeqCst));

        logger.fatalw("shutting down", &[("reason", json!("disk"))]);
        assert_eq!(code.load(Ordering::SeqCst), 1);
        assert_eq!(parse(&sink.entries()[0])["level"], json!("FATAL"));
    }

    #[test]
    fn test_replace_topology_swaps_sinks() {
        let (logger, first) = json_logger(Rank::Debug, LoggerOptions::default());
        logger.info(&[&"one"]);

        let second = Arc::new(MemorySink::new("second"));
        logger.replace_topology(RouterTopology::new(
            vec![Binding::new(
                "second",
                LevelPredicate::AtLeast(Rank::Debug),
                EncoderShape::Console,
                second.clone(),
            )],
            EncoderProfile::new(),
        ));
        logger.info(&[&"two"]);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(second.contents().contains("\ttwo"));
    }

    fn file_topology(path: &std::path::Path, diagnostics: &Arc<Diagnostics>) -> RouterTopology {
        let sink = RollingFileSink::new(SinkConfig::new(path), diagnostics.clone());
        RouterTopology::new(
            vec![Binding::new(
                path.display().to_string(),
                LevelPredicate::AtLeast(Rank::Debug),
                EncoderShape::Json,
                Arc::new(sink),
            )],
            EncoderProfile::new(),
        )
    }

    #[test]
    fn test_concurrent_swaps_lose_no_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("swap.log");
        let scratch = Arc::new(Diagnostics::new());
        let logger = Logger::new(file_topology(&path, &scratch));

        let stop = Arc::new(AtomicBool::new(false));
        let emitted = Arc::new(AtomicU64::new(0));
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let logger = logger.named("worker");
                let stop = stop.clone();
                let emitted = emitted.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        logger.infow("tick", &[("worker", json!(worker))]);
                        emitted.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for _ in 0..200 {
            logger.replace_topology(file_topology(&path, &scratch));
        }
        stop.store(true, Ordering::Relaxed);
        for worker in workers {
            worker.join().unwrap();
        }
        logger.sync().unwrap();

        let snapshot = logger.diagnostics();
        assert_eq!(snapshot.sink_errors, 0);
        assert_eq!(snapshot.records_routed, emitted.load(Ordering::Relaxed));
        assert!(snapshot.records_routed > 0);
    }

    #[test]
    fn test_log_event_keeps_supplied_caller() {
        let (logger, sink) = json_logger(Rank::Debug, LoggerOptions::default());
        let outcome = logger.log_event(
            Rank::Warn,
            "bridged".to_string(),
            vec![("k".to_string(), json!("v"))],
            Some(Caller::new("src/net/conn.rs", 12)),
        );
        assert_eq!(outcome.delivered, 1);
        let line = parse(&sink.entries()[0]);
        assert_eq!(line["caller"], json!("net/conn.rs:12"));
        assert_eq!(line["k"], json!("v"));
    }

    #[test]
    fn test_clones_share_diagnostics() {
        let (logger, _sink) = json_logger(Rank::Debug, LoggerOptions::default());
        let clone = logger.named("worker");
        clone.debug(&[&"x"]);
        assert_eq!(logger.diagnostics().records_routed, 1);
        assert!(logger.sync().is_ok());
    }
}

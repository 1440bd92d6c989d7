//! 输出模式选择
//!
//! 根据配置构建单输出或多输出拓扑。文件路径不可用时降级为仅控制台输出，
//! 初始化本身不会失败。

use crate::config::{FileTier, LogConfig};
use crate::core::encoder::{EncoderProfile, EncoderShape};
use crate::core::level::Rank;
use crate::core::router::{Binding, LevelPredicate, RouterTopology};
use crate::diagnostics::Diagnostics;
use crate::sinks::console::ConsoleSink;
use crate::sinks::rolling_file::RollingFileSink;
use crate::sinks::traits::LogSink;
use crate::utils::FileTools;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// 构建拓扑时发现的问题
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyReport {
    pub warnings: Vec<String>,
    /// 文件 sink 已被丢弃，只剩控制台
    pub console_only: bool,
}

impl TopologyReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        eprintln!("strata_log: {}", message);
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// 按配置的模式构建拓扑
///
/// 单输出：控制台和汇总文件，均为控制台形态。
/// 多输出：info 层和 warn 层文件（JSON 形态），外加控制台。
pub fn build_topology(
    multi_output: bool,
    config: &LogConfig,
    diagnostics: &Arc<Diagnostics>,
) -> (RouterTopology, TopologyReport) {
    let mut report = TopologyReport::default();
    let global = config.threshold();
    if !config.level_is_canonical() {
        report.warn(format!(
            "unknown log level '{}', using '{}'",
            config.level,
            global.name()
        ));
    }

    let encoder = EncoderProfile::new().with_color_levels(config.console_color);
    let tiers: &[FileTier] = if multi_output {
        &[FileTier::Info, FileTier::Warn]
    } else {
        &[FileTier::All]
    };

    let mut file_bindings = Vec::with_capacity(tiers.len());
    for &tier in tiers {
        let sink_config = config.rotate.sink_config(tier);
        if let Err(problem) = check_file_path(&sink_config.path) {
            report.warn(format!("{} log file unusable: {}", tier.as_str(), problem));
            continue;
        }
        if sink_config.max_size_overflows() {
            report.warn(format!(
                "{} log max_size {} MB is out of range, rotation effectively disabled",
                tier.as_str(),
                sink_config.max_size_mb
            ));
        }

        let sink: Arc<dyn LogSink> =
            Arc::new(RollingFileSink::new(sink_config, diagnostics.clone()));
        let (predicate, shape) = match tier {
            FileTier::Info => (LevelPredicate::InfoTierOnly { floor: global }, EncoderShape::Json),
            FileTier::Warn => (LevelPredicate::WarnTierOnly { floor: global }, EncoderShape::Json),
            FileTier::All => (LevelPredicate::AtLeast(global), EncoderShape::Console),
        };
        file_bindings.push(Binding::new(tier.as_str(), predicate, shape, sink));
    }

    let mut bindings = Vec::with_capacity(tiers.len() + 1);
    if file_bindings.len() == tiers.len() {
        bindings.extend(file_bindings);
    } else {
        report.console_only = true;
        report.warn("falling back to console-only logging".to_string());
    }
    bindings.push(console_binding(global));

    debug!(
        "Built {} topology with {} bindings at level {}",
        if multi_output { "multi-output" } else { "single-output" },
        bindings.len(),
        global
    );
    (RouterTopology::new(bindings, encoder), report)
}

/// 初始化之前使用的仅控制台拓扑
pub fn console_topology(threshold: Rank, color_levels: bool) -> RouterTopology {
    RouterTopology::new(
        vec![console_binding(threshold)],
        EncoderProfile::new().with_color_levels(color_levels),
    )
}

fn console_binding(threshold: Rank) -> Binding {
    Binding::new(
        "console",
        LevelPredicate::AtLeast(threshold),
        EncoderShape::Console,
        Arc::new(ConsoleSink::stdout()),
    )
}

fn check_file_path(path: &Path) -> std::result::Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("empty path".to_string());
    }
    if path.is_dir() {
        return Err(format!("'{}' is a directory", path.display()));
    }
    if !FileTools::is_file_writable(path) {
        return Err(format!("'{}' is not writable", path.display()));
    }
    Ok(())
}

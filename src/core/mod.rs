//! StrataLog 核心模块
//!
//! 本模块包含级别、记录、编码器、路由器、拓扑构建、日志门面和 tracing 桥接层。

pub mod encoder;
pub mod layer;
pub mod level;
pub mod logger;
pub mod record;
pub mod router;
pub mod topology;

// 重新导出核心类型
pub use encoder::{EncoderProfile, EncoderShape};
pub use layer::RouterLayer;
pub use level::{rank_of, Rank};
pub use logger::{Logger, LoggerOptions};
pub use record::{Caller, LogRecord};
pub use router::{Binding, LevelPredicate, RouteOutcome, RouterTopology, SinkRouter};
pub use topology::{build_topology, TopologyReport};

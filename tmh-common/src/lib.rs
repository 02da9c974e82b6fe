//! Throughput Measurement Helper - Common Library
//!
//! Shared types, the throughput parser, and the session supervisor used by
//! tmhd and by hosts embedding the module directly.

#![forbid(unsafe_code)]

pub mod emitter;
pub mod error;
pub mod events;
pub mod logging;
pub mod parse;
pub mod scanner;
pub mod session;
pub mod types;

pub use emitter::SampleEmitter;
pub use error::ControlError;
pub use events::{Event, EventBus};
pub use logging::{LogConfig, LogFormat, init_logging};
pub use parse::extract_throughput;
pub use scanner::StopToken;
pub use session::{SessionSupervisor, build_sink_args, build_source_args};
pub use types::{
    NodeId, NodeInfo, Protocol, Role, Sample, SessionState, SinkRequest, SourceRequest,
};

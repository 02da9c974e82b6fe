//! Common types used across TMH components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a measurement session acts as traffic source or sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Generates traffic towards a sink.
    Source,
    /// Receives traffic and reports what arrived.
    Sink,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// Transport protocol the measurement runs over.
///
/// Wire names are uppercase (`"TCP"`/`"UDP"`) to match the request format
/// used by upstream controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
        }
    }
}

/// Lifecycle state of a measurement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Request accepted, process not yet spawned.
    Starting,
    /// Process spawned, scanner consuming output.
    Running,
    /// Stop signaled, waiting for the scanner to wind down.
    Stopping,
    /// Scanner joined, process terminated, entry released.
    Stopped,
}

/// Request to start a traffic sink session.
///
/// Fully determines the argument vector passed to the measurement tool.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRequest {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Transport protocol.
    #[serde(default)]
    pub protocol: Protocol,
    /// Periodic report interval in seconds. Without it the tool only
    /// prints a final summary, so most callers set this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_interval: Option<u32>,
    /// TCP window size hint (e.g. `"128K"`). Carried for callers that set
    /// it but not mapped to a flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    /// Local address to bind the listener to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

impl SinkRequest {
    /// Sink request with default port and protocol.
    pub fn new() -> Self {
        Self {
            port: default_port(),
            protocol: Protocol::default(),
            report_interval: None,
            window: None,
            bind: None,
        }
    }
}

impl Default for SinkRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Request to start a traffic source session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRequest {
    /// Port the remote sink listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Transport protocol.
    #[serde(default)]
    pub protocol: Protocol,
    /// Periodic report interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_interval: Option<u32>,
    /// TCP window size hint. Carried but not mapped to a flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    /// Address of the sink to send traffic to.
    pub destination: String,
    /// Target bandwidth (e.g. `"5M"`). Only applied for UDP sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<String>,
    /// Run a bidirectional test.
    #[serde(default)]
    pub dual_test: bool,
    /// Stop after transmitting this much data (e.g. `"100M"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_volume: Option<String>,
    /// Stop after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Datagram payload length in bytes. Carried but not mapped to a flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_len: Option<u32>,
}

impl SourceRequest {
    /// Source request towards `destination` with default port and protocol.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            port: default_port(),
            protocol: Protocol::default(),
            report_interval: None,
            window: None,
            destination: destination.into(),
            bandwidth: None,
            dual_test: false,
            data_volume: None,
            duration: None,
            frame_len: None,
        }
    }
}

/// One extracted throughput measurement, tagged by role.
///
/// The throughput is kept as the raw token from the tool's output
/// (`"10.5 Mbits/sec"`); values are republished, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub role: Role,
    pub throughput: String,
}

/// Unique identifier for a peer node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Peer node bookkeeping entry. Tracked for visibility only; session
/// logic never consults it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node identifier.
    pub id: NodeId,
    /// Whether the node runs on this host.
    pub local: bool,
    /// When the node joined.
    pub joined_at: DateTime<Utc>,
}

impl NodeInfo {
    /// New entry stamped with the current time.
    pub fn new(id: impl Into<String>, local: bool) -> Self {
        Self {
            id: NodeId::new(id),
            local,
            joined_at: Utc::now(),
        }
    }
}

fn default_port() -> u16 {
    5001
}

//! The control module: bus consumption and event dispatch.
//!
//! Inbound events are dispatched through a single `match` on the closed
//! event enum. Start failures are logged with the originating operation's
//! name and returned to direct callers; they are never swallowed.

use crate::config::DaemonConfig;
use crate::nodes::NodeRegistry;
use tmh_common::{
    ControlError, Event, EventBus, Role, SessionState, SessionSupervisor, SinkRequest,
    SourceRequest,
};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, trace, warn};

/// Throughput measurement control module.
pub struct ControlModule {
    supervisor: SessionSupervisor,
    nodes: NodeRegistry,
    bus: EventBus,
}

impl ControlModule {
    pub fn new(config: &DaemonConfig, bus: EventBus) -> Self {
        Self {
            supervisor: SessionSupervisor::new(&config.executable, bus.clone()),
            nodes: NodeRegistry::new(),
            bus,
        }
    }

    /// Subscribe to the bus this module was built with.
    ///
    /// Callers subscribe before spawning [`run`](Self::run) so no event
    /// emitted in between is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Consume `rx` until the bus closes.
    ///
    /// Dispatch is sequential: one control task handles requests in
    /// arrival order, and a blocking stop delays later events rather than
    /// racing them.
    pub async fn run(&self, mut rx: broadcast::Receiver<Event>) {
        info!("Throughput module started");
        loop {
            match rx.recv().await {
                Ok(event) => self.dispatch(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event bus lagged, {skipped} events skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Throughput module stopped");
    }

    async fn dispatch(&self, event: Event) {
        match event {
            Event::StartSink(request) => {
                if let Err(e) = self.start_sink(&request).await {
                    error!("{e}");
                }
            }
            Event::StartSource(request) => {
                if let Err(e) = self.start_source(&request).await {
                    error!("{e}");
                }
            }
            Event::StopSink => self.stop(Role::Sink).await,
            Event::StopSource => self.stop(Role::Source).await,
            Event::NodeJoined { node } => self.nodes.add(node).await,
            Event::NodeLeft { node, reason } => self.nodes.remove(&node, &reason).await,
            // Our own outbound events circle back on the shared bus.
            Event::Sample(_) => trace!("ignoring sample on the inbound path"),
        }
    }

    /// Start a sink session.
    pub async fn start_sink(&self, request: &SinkRequest) -> Result<(), ControlError> {
        self.supervisor.start_sink(request).await
    }

    /// Start a source session.
    pub async fn start_source(&self, request: &SourceRequest) -> Result<(), ControlError> {
        self.supervisor.start_source(request).await
    }

    /// Stop the session for `role`. Idempotent.
    pub async fn stop(&self, role: Role) {
        self.supervisor.stop(role).await;
    }

    /// Lifecycle state for `role`, if a session is registered.
    pub async fn state(&self, role: Role) -> Option<SessionState> {
        self.supervisor.state(role).await
    }

    /// Peer node registry.
    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    /// Stop all sessions. Called on daemon shutdown.
    pub async fn shutdown(&self) {
        self.supervisor.stop_all().await;
        info!("Throughput module exit");
    }
}

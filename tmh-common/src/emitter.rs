//! Sample publication onto the event bus.

use crate::events::{Event, EventBus};
use crate::types::{Role, Sample};
use tracing::info;

/// Publishes extracted throughput samples, tagged by role.
///
/// Stateless apart from the bus handle; samples are published immediately
/// and never stored.
#[derive(Clone)]
pub struct SampleEmitter {
    bus: EventBus,
}

impl SampleEmitter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Publish one throughput sample.
    pub fn emit(&self, role: Role, throughput: &str) {
        info!("{role} side throughput: {throughput}");
        self.bus.emit(Event::Sample(Sample {
            role,
            throughput: throughput.to_string(),
        }));
    }
}

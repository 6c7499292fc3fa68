mod classifier;
mod enricher;

pub use classifier::classify;
pub use enricher::enrich;

use tracing::{debug, error};

use crate::events::{ChainEvent, RawEvent};

/// Turns raw contract events into canonical ones.
#[derive(Debug, Clone)]
pub struct Processor {
    chain: String,
}

impl Processor {
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
        }
    }

    /// Classifies and enriches a single raw event. Unknown names and
    /// malformed arguments drop the event and yield nothing.
    pub fn process(&self, event: &RawEvent) -> Vec<ChainEvent> {
        let Some(kind) = classify(&event.event_name) else {
            debug!(chain = %self.chain, "Skipping unknown event: {}", event.event_name);
            return Vec::new();
        };

        match enrich(event.block_number, kind, &event.args) {
            Ok(enriched) => vec![enriched],
            Err(e) => {
                error!(
                    chain = %self.chain,
                    block = event.block_number,
                    "Event enrichment failed: {}",
                    e
                );
                Vec::new()
            }
        }
    }
}

use async_trait::async_trait;
use eyre::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::events::ChainEvent;
use crate::labels::label;

/// A step in the per-event pipeline. `previous` is whatever the handler
/// before it returned, `None` for the first handler.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &ChainEvent, previous: Option<Value>) -> Result<Option<Value>>;
}

/// Ordered handlers run one after another for every event.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs every handler on `event`, threading each result into the next.
    /// A failing handler stops the chain for this event only.
    pub async fn run(&self, event: &ChainEvent) -> Option<Value> {
        let mut previous = None;
        for (index, handler) in self.handlers.iter().enumerate() {
            match handler.handle(event, previous).await {
                Ok(result) => previous = result,
                Err(e) => {
                    error!(
                        "Handler {} failed on {} event at block {}: {:#}",
                        index,
                        event.data.kind(),
                        event.block_number,
                        e
                    );
                    return None;
                }
            }
        }
        previous
    }
}

/// Logs a one-line summary of every event.
pub struct LogHandler {
    chain: String,
}

impl LogHandler {
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
        }
    }
}

#[async_trait]
impl EventHandler for LogHandler {
    async fn handle(&self, event: &ChainEvent, previous: Option<Value>) -> Result<Option<Value>> {
        let label = label(Some(&self.chain), &event.data);
        info!(
            chain = %self.chain,
            block = event.block_number,
            "{}: {}",
            label.heading,
            label.label
        );
        Ok(previous)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::{EventData, NewDelay};
    use eyre::eyre;
    use serde_json::json;
    use std::sync::Mutex;

    pub(crate) fn sample_event(block_number: u64) -> ChainEvent {
        ChainEvent {
            block_number,
            exclude_addresses: vec![],
            data: EventData::NewDelay(NewDelay { new_delay: 60 }),
        }
    }

    /// Records what it saw and returns a fixed value.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub seen: Mutex<Vec<(u64, Option<Value>)>>,
        pub output: Option<Value>,
        pub fail_on: Option<u64>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &ChainEvent, previous: Option<Value>) -> Result<Option<Value>> {
            self.seen.lock().unwrap().push((event.block_number, previous));
            if self.fail_on == Some(event.block_number) {
                return Err(eyre!("boom"));
            }
            Ok(self.output.clone())
        }
    }

    #[tokio::test]
    async fn previous_result_is_passed_forward() {
        let first = Arc::new(Recorder {
            output: Some(json!({ "rowId": 17 })),
            ..Default::default()
        });
        let second = Arc::new(Recorder::default());
        let chain = HandlerChain::new(vec![first.clone() as Arc<dyn EventHandler>, second.clone()]);

        chain.run(&sample_event(1)).await;

        assert_eq!(*first.seen.lock().unwrap(), vec![(1, None)]);
        assert_eq!(
            *second.seen.lock().unwrap(),
            vec![(1, Some(json!({ "rowId": 17 })))]
        );
    }

    #[tokio::test]
    async fn failure_stops_only_that_event() {
        let first = Arc::new(Recorder {
            fail_on: Some(1),
            output: Some(json!("ok")),
            ..Default::default()
        });
        let second = Arc::new(Recorder::default());
        let chain = HandlerChain::new(vec![first.clone() as Arc<dyn EventHandler>, second.clone()]);

        assert_eq!(chain.run(&sample_event(1)).await, None);
        chain.run(&sample_event(2)).await;

        assert_eq!(first.seen.lock().unwrap().len(), 2);
        assert_eq!(*second.seen.lock().unwrap(), vec![(2, Some(json!("ok")))]);
    }

    #[tokio::test]
    async fn returns_last_result() {
        let only = Arc::new(Recorder {
            output: Some(json!(3)),
            ..Default::default()
        });
        let chain = HandlerChain::new(vec![only as Arc<dyn EventHandler>]);
        assert_eq!(chain.run(&sample_event(1)).await, Some(json!(3)));
        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn log_handler_is_transparent() {
        let chain = HandlerChain::new(vec![
            Arc::new(Recorder {
                output: Some(json!("first")),
                ..Default::default()
            }) as Arc<dyn EventHandler>,
            Arc::new(LogHandler::new("marlin")),
        ]);
        assert_eq!(chain.run(&sample_event(1)).await, Some(json!("first")));
    }
}

use eyre::Result;
use futures_util::stream::select_all;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::api::ChainApi;
use crate::events::{ContractKind, RawEvent};

/// Live listener on the token, governance and timelock contracts.
pub struct Subscriber<A: ?Sized> {
    api: Arc<A>,
    chain: String,
    verbose: bool,
    active: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<A: ?Sized> Subscriber<A> {
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Detaches all three listeners. Does nothing when not subscribed.
    pub fn unsubscribe(&mut self) {
        match self.active.take() {
            Some((cancel, _task)) => {
                cancel.cancel();
                info!(chain = %self.chain, "Unsubscribed from contract events");
            }
            None => debug!(chain = %self.chain, "Unsubscribe called while not subscribed"),
        }
    }
}

impl<A: ChainApi + ?Sized + 'static> Subscriber<A> {
    pub fn new(api: Arc<A>, chain: impl Into<String>, verbose: bool) -> Self {
        Self {
            api,
            chain: chain.into(),
            verbose,
            active: None,
        }
    }

    /// Forwards every raw event from any of the three contracts into `tx`,
    /// in the order the transport delivers them.
    pub async fn subscribe(&mut self, tx: Sender<RawEvent>) -> Result<()> {
        if self.is_subscribed() {
            warn!(chain = %self.chain, "Already subscribed, replacing existing listeners");
            self.unsubscribe();
        }

        let mut streams = Vec::with_capacity(ContractKind::ALL.len());
        for contract in ContractKind::ALL {
            streams.push(self.api.subscribe_events(contract).await?);
            debug!(chain = %self.chain, "Listening to {} events", contract);
        }
        let mut events = select_all(streams);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let chain = self.chain.clone();
        let verbose = self.verbose;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    next = events.next() => {
                        let Some(event) = next else {
                            warn!(chain = %chain, "All contract event streams closed");
                            break;
                        };
                        if verbose {
                            info!(chain = %chain, "Received {} event at block {}", event.event_name, event.block_number);
                        } else {
                            trace!(chain = %chain, "Received {} event at block {}", event.event_name, event.block_number);
                        }
                        if tx.send(event).await.is_err() {
                            warn!(chain = %chain, "Event receiver dropped, stopping listener");
                            break;
                        }
                    }
                }
            }
        });

        self.active = Some((cancel, task));
        info!(chain = %self.chain, "Subscribed to contract events");
        Ok(())
    }
}

impl<A: ?Sized> Drop for Subscriber<A> {
    fn drop(&mut self) {
        if let Some((cancel, _)) = self.active.take() {
            cancel.cancel();
        }
    }
}

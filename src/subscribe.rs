//! Startup sequence: connect, catch up on missed events, then go live.

use eyre::Result;
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{AlloyChainApi, ChainApi, ContractAddresses};
use crate::events::DisconnectedRange;
use crate::handlers::{EventHandler, HandlerChain};
use crate::listener::Subscriber;
use crate::processor::Processor;
use crate::storage::{BlockDater, StorageFetcher};

const EVENT_CHANNEL_SIZE: usize = 100;

/// Reports the block range missed since the last run, if known.
pub type ReconnectRangeFn =
    Box<dyn Fn() -> BoxFuture<'static, Result<Option<DisconnectedRange>>> + Send + Sync>;

pub fn reconnect_range_fn<F, Fut>(discover: F) -> ReconnectRangeFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<DisconnectedRange>>> + Send + 'static,
{
    Box::new(move || discover().boxed())
}

pub struct SubscribeOptions<A: ?Sized> {
    pub chain: String,
    pub api: Arc<A>,
    pub handlers: Vec<Arc<dyn EventHandler>>,
    pub skip_catchup: bool,
    pub discover_reconnect_range: Option<ReconnectRangeFn>,
    pub dater: Arc<dyn BlockDater>,
    pub fetch_all_completed: bool,
    pub verbose: bool,
}

/// Calls `connect` until it succeeds, sleeping `retry_interval` between
/// attempts. There is no attempt limit; only `cancel` ends the loop early.
pub async fn connect_with_retry<T, F, Fut>(
    mut connect: F,
    retry_interval: Duration,
    cancel: &CancellationToken,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect() => match result {
                Ok(connected) => return Some(connected),
                Err(e) => error!("Connection failed: {:#}. Retrying in {:?}", e, retry_interval),
            },
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(retry_interval) => {}
        }
    }
    warn!("Connection attempts cancelled");
    None
}

pub async fn create_api(
    rpc_url: &str,
    contracts: ContractAddresses,
    retry_interval: Duration,
    cancel: &CancellationToken,
) -> Option<AlloyChainApi> {
    let api = connect_with_retry(
        || AlloyChainApi::connect(rpc_url, contracts),
        retry_interval,
        cancel,
    )
    .await?;
    info!("Connection to chain successful");
    Some(api)
}

/// Runs catch-up (unless skipped) and then attaches the live listener. Every
/// canonical event from either source goes through `handlers` in order.
///
/// Catch-up problems never prevent going live; only a failure to attach the
/// live listener is returned.
pub async fn subscribe_events<A>(options: SubscribeOptions<A>) -> Result<Subscriber<A>>
where
    A: ChainApi + ?Sized + 'static,
{
    let SubscribeOptions {
        chain,
        api,
        handlers,
        skip_catchup,
        discover_reconnect_range,
        dater,
        fetch_all_completed,
        verbose,
    } = options;

    let handlers = HandlerChain::new(handlers);
    let processor = Processor::new(chain.clone());

    if skip_catchup {
        info!(chain = %chain, "Skipping event catchup on startup!");
    } else {
        let fetcher = StorageFetcher::new(api.clone(), dater, chain.clone());
        catch_up(
            &chain,
            &fetcher,
            discover_reconnect_range.as_ref(),
            fetch_all_completed,
            &handlers,
        )
        .await;
    }

    let mut subscriber = Subscriber::new(api, chain.clone(), verbose);
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    subscriber.subscribe(tx).await?;

    tokio::spawn(async move {
        while let Some(raw) = rx.recv().await {
            for event in processor.process(&raw) {
                handlers.run(&event).await;
            }
        }
        debug!(chain = %chain, "Live event consumer stopped");
    });

    Ok(subscriber)
}

async fn catch_up<A: ChainApi + ?Sized>(
    chain: &str,
    fetcher: &StorageFetcher<A>,
    discover: Option<&ReconnectRangeFn>,
    fetch_all_completed: bool,
    handlers: &HandlerChain,
) {
    let Some(discover) = discover else {
        warn!(chain, "No reconnect range discovery configured, skipping event catchup.");
        return;
    };

    let range = match discover().await {
        Ok(Some(range)) => range,
        Ok(None) => {
            warn!(chain, "No offline range found, skipping event catchup.");
            return;
        }
        Err(e) => {
            error!(chain, "Could not discover offline range: {:#}. Skipping event catchup.", e);
            return;
        }
    };

    info!(
        chain,
        "Missed blocks: {:?} to {:?}, running catchup.", range.start_block, range.end_block
    );
    match fetcher.fetch(range, fetch_all_completed).await {
        Ok(events) => {
            info!(chain, "Catchup produced {} events.", events.len());
            for event in &events {
                handlers.run(event).await;
            }
        }
        Err(e) => error!(chain, "Unable to fetch events from storage: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockChainApi;
    use crate::events::{ContractKind, ProposalState, RawEvent};
    use crate::handlers::tests::Recorder;
    use crate::storage::ChainBlockDater;
    use eyre::eyre;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn options(
        api: Arc<MockChainApi>,
        handler: Arc<Recorder>,
        discover: Option<ReconnectRangeFn>,
    ) -> SubscribeOptions<MockChainApi> {
        SubscribeOptions {
            chain: "test".to_string(),
            api: api.clone(),
            handlers: vec![handler as Arc<dyn EventHandler>],
            skip_catchup: false,
            discover_reconnect_range: discover,
            dater: Arc::new(ChainBlockDater::new(api)),
            fetch_all_completed: false,
            verbose: false,
        }
    }

    async fn wait_for(recorder: &Recorder, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while recorder.seen.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("handler was not called in time");
    }

    #[tokio::test]
    async fn failing_range_discovery_still_goes_live() {
        let api = Arc::new(MockChainApi::new(1_000).with_proposal(1, ProposalState::Active));
        let recorder = Arc::new(Recorder::default());
        let discover = reconnect_range_fn(|| async { Err(eyre!("db down")) });

        let subscriber = subscribe_events(options(api.clone(), recorder.clone(), Some(discover)))
            .await
            .unwrap();

        assert!(subscriber.is_subscribed());
        assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 3);
        assert!(api.proposal_reads.lock().unwrap().is_empty());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_range_discovery_skips_catchup() {
        let api = Arc::new(MockChainApi::new(1_000).with_proposal(1, ProposalState::Active));
        let recorder = Arc::new(Recorder::default());
        let discover = reconnect_range_fn(|| async { Ok(None) });

        subscribe_events(options(api.clone(), recorder, Some(discover)))
            .await
            .unwrap();

        assert!(api.proposal_reads.lock().unwrap().is_empty());
        assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn catchup_events_reach_handlers_before_live() {
        let api = Arc::new(
            MockChainApi::new(1_000)
                .with_proposal(1, ProposalState::Active)
                .with_proposal(2, ProposalState::Executed),
        );
        let recorder = Arc::new(Recorder::default());
        let discover = reconnect_range_fn(|| async { Ok(Some(DisconnectedRange::default())) });

        let subscriber = subscribe_events(options(api.clone(), recorder.clone(), Some(discover)))
            .await
            .unwrap();

        // Proposal 2 is executed: created + executed, and the walk stops there.
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
        assert_eq!(*api.proposal_reads.lock().unwrap(), vec![2]);
        assert!(subscriber.is_subscribed());
    }

    #[tokio::test]
    async fn skip_catchup_never_reads_storage() {
        let api = Arc::new(MockChainApi::new(1_000).with_proposal(1, ProposalState::Active));
        let recorder = Arc::new(Recorder::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let discover = reconnect_range_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some(DisconnectedRange::default())) }
        });
        let mut opts = options(api.clone(), recorder, Some(discover));
        opts.skip_catchup = true;

        subscribe_events(opts).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(api.proposal_reads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn live_events_run_through_processor_and_handlers() {
        let api = Arc::new(MockChainApi::new(1_000));
        let recorder = Arc::new(Recorder::default());
        let mut opts = options(api.clone(), recorder.clone(), None);
        opts.skip_catchup = true;
        let mut subscriber = subscribe_events(opts).await.unwrap();

        let event = |name: &str, block_number: u64, args: serde_json::Value| RawEvent {
            event_name: name.to_string(),
            block_number,
            args: args.as_object().cloned().unwrap_or_default(),
        };
        api.emit(ContractKind::Timelock, event("NothingHappened", 5, json!({})));
        api.emit(ContractKind::Timelock, event("NewDelay", 6, json!({ "newDelay": "bad" })));
        api.emit(ContractKind::Timelock, event("NewDelay", 7, json!({ "newDelay": 3600 })));

        wait_for(&recorder, 1).await;
        assert_eq!(recorder.seen.lock().unwrap()[0].0, 7);

        subscriber.unsubscribe();
        assert!(!subscriber.is_subscribed());
    }

    #[tokio::test]
    async fn live_listener_failure_is_returned() {
        let api = Arc::new(MockChainApi::new(1_000).fail_subscriptions());
        let recorder = Arc::new(Recorder::default());
        let mut opts = options(api, recorder, None);
        opts.skip_catchup = true;

        assert!(subscribe_events(opts).await.is_err());
    }

    #[tokio::test]
    async fn retries_until_connected() {
        let attempts = Mutex::new(0);
        let cancel = CancellationToken::new();

        let connected = connect_with_retry(
            || {
                let mut n = attempts.lock().unwrap();
                *n += 1;
                let attempt = *n;
                async move {
                    if attempt < 3 {
                        Err(eyre!("connection refused"))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            Duration::from_millis(1),
            &cancel,
        )
        .await;

        assert_eq!(connected, Some(3));
    }

    #[tokio::test]
    async fn cancellation_ends_retry_loop() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let connected: Option<()> = connect_with_retry(
            || async { Err(eyre!("connection refused")) },
            Duration::from_millis(5),
            &cancel,
        )
        .await;

        assert!(connected.is_none());
    }
}

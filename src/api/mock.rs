//! In-memory chain used by tests.

use async_trait::async_trait;
use eyre::{eyre, Result};
use futures_util::{stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{ChainApi, RawEventStream};
use crate::events::{ContractKind, Proposal, ProposalState, RawEvent};

pub const GENESIS_TIMESTAMP: u64 = 1_600_000_000;
pub const BLOCK_TIME: u64 = 12;

pub struct MockChainApi {
    head: Option<u64>,
    voting_delay: u64,
    voting_period: u64,
    proposals: Vec<(Proposal, ProposalState)>,
    senders: Mutex<HashMap<ContractKind, mpsc::UnboundedSender<RawEvent>>>,
    fail_subscribe: AtomicBool,
    unreadable: Vec<u64>,
    pub subscribe_calls: AtomicUsize,
    pub proposal_reads: Mutex<Vec<u64>>,
}

impl MockChainApi {
    pub fn new(head: u64) -> Self {
        Self {
            head: Some(head),
            voting_delay: 1,
            voting_period: 17280,
            proposals: Vec::new(),
            senders: Mutex::new(HashMap::new()),
            fail_subscribe: AtomicBool::new(false),
            unreadable: Vec::new(),
            subscribe_calls: AtomicUsize::new(0),
            proposal_reads: Mutex::new(Vec::new()),
        }
    }

    /// A chain whose head block cannot be read.
    pub fn headless() -> Self {
        Self {
            head: None,
            ..Self::new(0)
        }
    }

    /// Adds the next proposal; ids are assigned from 1 upwards.
    pub fn with_proposal(mut self, start_block: u64, state: ProposalState) -> Self {
        let id = self.proposals.len() as u64 + 1;
        let proposal = Proposal {
            id,
            proposer: format!("0x{:040x}", id),
            start_block,
            end_block: start_block + self.voting_period,
            eta: if state == ProposalState::Queued || state == ProposalState::Executed {
                1_700_000_000 + id
            } else {
                0
            },
            canceled: state == ProposalState::Canceled,
            executed: state == ProposalState::Executed,
            for_votes: "0".to_string(),
            against_votes: "0".to_string(),
        };
        self.proposals.push((proposal, state));
        self
    }

    pub fn fail_subscriptions(self) -> Self {
        self.fail_subscribe.store(true, Ordering::SeqCst);
        self
    }

    /// Makes storage reads of proposal `id` fail.
    pub fn fail_proposal_read(mut self, id: u64) -> Self {
        self.unreadable.push(id);
        self
    }

    /// Delivers a raw event to the contract's live listener, if attached.
    pub fn emit(&self, contract: ContractKind, event: RawEvent) -> bool {
        let senders = self.senders.lock().unwrap();
        senders
            .get(&contract)
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }

    pub fn listener_attached(&self, contract: ContractKind) -> bool {
        let senders = self.senders.lock().unwrap();
        senders.get(&contract).map(|tx| !tx.is_closed()).unwrap_or(false)
    }

    fn entry(&self, id: u64) -> Result<&(Proposal, ProposalState)> {
        self.proposals
            .iter()
            .find(|(p, _)| p.id == id)
            .ok_or_else(|| eyre!("Proposal {} does not exist", id))
    }
}

#[async_trait]
impl ChainApi for MockChainApi {
    async fn block_number(&self) -> Result<u64> {
        self.head.ok_or_else(|| eyre!("connection reset"))
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64> {
        match self.head {
            Some(head) if block_number <= head => Ok(GENESIS_TIMESTAMP + block_number * BLOCK_TIME),
            _ => Err(eyre!("Block {} not found", block_number)),
        }
    }

    async fn voting_delay(&self) -> Result<u64> {
        Ok(self.voting_delay)
    }

    async fn voting_period(&self) -> Result<u64> {
        Ok(self.voting_period)
    }

    async fn proposal_count(&self) -> Result<u64> {
        Ok(self.proposals.len() as u64)
    }

    async fn proposal(&self, id: u64) -> Result<Proposal> {
        self.proposal_reads.lock().unwrap().push(id);
        if self.unreadable.contains(&id) {
            return Err(eyre!("execution reverted reading proposal {}", id));
        }
        Ok(self.entry(id)?.0.clone())
    }

    async fn proposal_state(&self, id: u64) -> Result<ProposalState> {
        Ok(self.entry(id)?.1)
    }

    async fn subscribe_events(&self, contract: ContractKind) -> Result<RawEventStream> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(eyre!("subscription refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().insert(contract, tx);
        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(events.boxed())
    }
}

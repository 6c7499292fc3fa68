//! Reconstruction of missed governance events from current contract storage.
//!
//! Used only to cover downtime: a proposal's storage snapshot is turned back
//! into the events that produced it. Most `ProposalCreated` fields (targets,
//! values, signatures, calldatas, description) are not kept in storage and
//! come back empty, and individual `VoteCast` events cannot be recovered at
//! all.

mod dater;

pub use dater::{BlockDate, BlockDater, ChainBlockDater};

use eyre::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::ChainApi;
use crate::events::{
    ChainEvent, DisconnectedRange, EventData, Proposal, ProposalCanceled, ProposalCreated,
    ProposalExecuted, ProposalQueued, ProposalState,
};

#[derive(Debug, Clone, Copy)]
struct Constants {
    voting_period: u64,
    current_block: u64,
}

pub struct StorageFetcher<A: ?Sized> {
    api: Arc<A>,
    dater: Arc<dyn BlockDater>,
    chain: String,
}

impl<A: ChainApi + ?Sized> StorageFetcher<A> {
    pub fn new(api: Arc<A>, dater: Arc<dyn BlockDater>, chain: impl Into<String>) -> Self {
        Self {
            api,
            dater,
            chain: chain.into(),
        }
    }

    /// Reads the constants needed to place proposals in time. `None` when the
    /// current block cannot be read, which makes any fetch impossible.
    async fn init_constants(&self) -> Result<Option<Constants>> {
        let current_block = match self.api.block_number().await {
            Ok(block) => block,
            Err(e) => {
                error!(chain = %self.chain, "Failed to fetch current block! Aborting fetch: {}", e);
                return Ok(None);
            }
        };
        let voting_delay = self.api.voting_delay().await?;
        let voting_period = self.api.voting_period().await?;
        let current_timestamp = self.api.block_timestamp(current_block).await?;
        info!(
            chain = %self.chain,
            "Current block: {}, timestamp: {}, voting delay: {}, voting period: {}",
            current_block, current_timestamp, voting_delay, voting_period
        );
        Ok(Some(Constants {
            voting_period,
            current_block,
        }))
    }

    /// Fetches all events reconstructable from storage whose proposal starts
    /// inside `range` (both bounds inclusive), newest proposal first. A failed
    /// proposal read ends the walk early with what was gathered so far.
    ///
    /// Unless `fetch_all_completed` is set, the walk stops at the first
    /// executed proposal, on the assumption that everything older was seen
    /// by an earlier run.
    pub async fn fetch(
        &self,
        range: DisconnectedRange,
        fetch_all_completed: bool,
    ) -> Result<Vec<ChainEvent>> {
        let Some(constants) = self.init_constants().await? else {
            return Ok(Vec::new());
        };

        let start = range.start_block.unwrap_or(0);
        if start >= constants.current_block {
            error!(
                chain = %self.chain,
                "Start block {} greater than current block {}!", start, constants.current_block
            );
            return Ok(Vec::new());
        }
        let end = range.end_block.unwrap_or(constants.current_block);
        if start >= end {
            error!(chain = %self.chain, "Invalid fetch range: {}-{}.", start, end);
            return Ok(Vec::new());
        }
        info!(chain = %self.chain, "Fetching proposal events for range: {}-{}.", start, end);

        let count = self.api.proposal_count().await?;
        let mut results = Vec::new();
        let mut fetched = 0usize;

        // Newest first: a fresh reconnect only needs the tail of the queue.
        for id in (1..=count).rev() {
            let proposal = match self.api.proposal(id).await {
                Ok(proposal) => proposal,
                Err(e) => {
                    error!(
                        chain = %self.chain,
                        "Failed to read proposal {}: {:#}. Returning {} events fetched so far.",
                        id, e, results.len()
                    );
                    break;
                }
            };
            debug!(chain = %self.chain, "Fetched proposal {} from storage.", id);

            let Some(start_block) = self.resolve_start_block(&proposal, constants).await else {
                continue;
            };

            if start_block < start {
                debug!(
                    chain = %self.chain,
                    "Proposal start block ({}) is before {}, ending fetch.", start_block, start
                );
                break;
            }
            if start_block > end {
                debug!(
                    chain = %self.chain,
                    "Proposal start block ({}) is after {}, continuing.", start_block, end
                );
                continue;
            }

            let events = match self.events_from_proposal(&proposal, start_block).await {
                Ok(events) => events,
                Err(e) => {
                    error!(
                        chain = %self.chain,
                        "Failed to read state of proposal {}: {:#}. Returning {} events fetched so far.",
                        id, e, results.len()
                    );
                    break;
                }
            };
            let executed = events
                .iter()
                .any(|e| matches!(e.data, EventData::ProposalExecuted(_)));
            results.extend(events);
            fetched += 1;

            if !fetch_all_completed && executed {
                debug!(chain = %self.chain, "Proposal {} is executed, halting fetch.", id);
                break;
            }
            if range.max_results.is_some_and(|max| fetched >= max) {
                debug!(chain = %self.chain, "Fetched {} proposals, halting fetch.", fetched);
                break;
            }
        }

        info!(chain = %self.chain, "Reconstructed {} events from storage.", results.len());
        Ok(results)
    }

    /// Reconstructs the events of a single proposal.
    pub async fn fetch_one(&self, id: u64) -> Result<Vec<ChainEvent>> {
        let Some(constants) = self.init_constants().await? else {
            return Ok(Vec::new());
        };

        let proposal = match self.api.proposal(id).await {
            Ok(proposal) => proposal,
            Err(e) => {
                error!(chain = %self.chain, "Proposal {} not found: {}", id, e);
                return Ok(Vec::new());
            }
        };

        match self.resolve_start_block(&proposal, constants).await {
            Some(start_block) => self.events_from_proposal(&proposal, start_block).await,
            None => Ok(Vec::new()),
        }
    }

    /// Maps the proposal's start onto a historical block. Failures are logged
    /// and skip only this proposal.
    async fn resolve_start_block(&self, proposal: &Proposal, constants: Constants) -> Option<u64> {
        let starting_time = proposal
            .start_block
            .saturating_mul(constants.voting_period)
            .saturating_add(constants.current_block);
        debug!(chain = %self.chain, "Fetching block for timestamp {}.", starting_time);

        match self
            .dater
            .block_by_timestamp(starting_time.saturating_mul(1000))
            .await
        {
            Ok(resolved) => {
                debug!(
                    chain = %self.chain,
                    "For timestamp {}, fetched block #{}.", resolved.date, resolved.block
                );
                Some(resolved.block)
            }
            Err(e) => {
                error!(
                    chain = %self.chain,
                    "Unable to fetch closest block to timestamp {}: {}. Skipping proposal {}.",
                    starting_time, e, proposal.id
                );
                None
            }
        }
    }

    async fn events_from_proposal(
        &self,
        proposal: &Proposal,
        start_block: u64,
    ) -> Result<Vec<ChainEvent>> {
        let mut events = vec![ChainEvent {
            block_number: start_block,
            exclude_addresses: vec![proposal.proposer.clone()],
            data: EventData::ProposalCreated(ProposalCreated {
                id: proposal.id,
                proposer: proposal.proposer.clone(),
                targets: Vec::new(),
                values: Vec::new(),
                signatures: Vec::new(),
                calldatas: Vec::new(),
                start_block: proposal.start_block,
                end_block: proposal.end_block,
                description: String::new(),
            }),
        }];

        if proposal.canceled {
            events.push(ChainEvent {
                block_number: proposal.end_block,
                exclude_addresses: Vec::new(),
                data: EventData::ProposalCanceled(ProposalCanceled { id: proposal.id }),
            });
        }

        match self.api.proposal_state(proposal.id).await? {
            ProposalState::Queued => events.push(ChainEvent {
                block_number: proposal.end_block,
                exclude_addresses: Vec::new(),
                data: EventData::ProposalQueued(ProposalQueued {
                    id: proposal.id,
                    eta: proposal.eta,
                }),
            }),
            ProposalState::Executed => events.push(ChainEvent {
                block_number: proposal.end_block,
                exclude_addresses: Vec::new(),
                data: EventData::ProposalExecuted(ProposalExecuted { id: proposal.id }),
            }),
            ProposalState::Pending
            | ProposalState::Active
            | ProposalState::Canceled
            | ProposalState::Defeated
            | ProposalState::Succeeded
            | ProposalState::Expired => {}
        }

        Ok(events)
    }
}

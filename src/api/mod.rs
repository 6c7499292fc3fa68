//! Read and subscribe capability over the token, governance and timelock
//! contracts.

mod contracts;
mod decode;
#[cfg(test)]
pub mod mock;
mod provider;

pub use decode::{live_event, raw_event};
pub use provider::{connect, AlloyChainApi, ContractAddresses, WsProvider};

use async_trait::async_trait;
use eyre::Result;
use futures_util::stream::BoxStream;

use crate::events::{ContractKind, Proposal, ProposalState, RawEvent};

pub type RawEventStream = BoxStream<'static, RawEvent>;

/// Everything the ingestion pipeline needs from the chain. Implementations
/// must be safe to share across tasks for concurrent reads.
#[async_trait]
pub trait ChainApi: Send + Sync {
    async fn block_number(&self) -> Result<u64>;

    /// Block timestamp in seconds.
    async fn block_timestamp(&self, block_number: u64) -> Result<u64>;

    async fn voting_delay(&self) -> Result<u64>;

    async fn voting_period(&self) -> Result<u64>;

    async fn proposal_count(&self) -> Result<u64>;

    async fn proposal(&self, id: u64) -> Result<Proposal>;

    async fn proposal_state(&self, id: u64) -> Result<ProposalState>;

    /// Live stream of every event the contract emits from now on. Dropping
    /// the stream detaches the listener.
    async fn subscribe_events(&self, contract: ContractKind) -> Result<RawEventStream>;
}

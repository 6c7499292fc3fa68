use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider, WsConnect};
use alloy::pubsub::PubSubFrontend;
use alloy::rpc::types::{BlockNumberOrTag, Filter};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use futures_util::{future, StreamExt};
use serde::Deserialize;
use url::Url;

use super::contracts::GovernorAlpha;
use super::{decode, ChainApi, RawEventStream};
use crate::events::{ContractKind, Proposal, ProposalState};

pub type WsProvider = RootProvider<PubSubFrontend>;

pub async fn connect(rpc_url: &str) -> Result<WsProvider> {
    let url = Url::parse(rpc_url)?;
    let ws = WsConnect::new(url);
    let provider = ProviderBuilder::new().on_ws(ws).await?;
    Ok(provider)
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct ContractAddresses {
    pub token: Address,
    pub governor: Address,
    pub timelock: Address,
}

impl ContractAddresses {
    pub fn get(&self, contract: ContractKind) -> Address {
        match contract {
            ContractKind::Token => self.token,
            ContractKind::Governance => self.governor,
            ContractKind::Timelock => self.timelock,
        }
    }
}

/// Chain capability backed by a websocket alloy provider.
#[derive(Clone)]
pub struct AlloyChainApi {
    provider: WsProvider,
    contracts: ContractAddresses,
}

impl AlloyChainApi {
    pub async fn connect(rpc_url: &str, contracts: ContractAddresses) -> Result<Self> {
        let provider = connect(rpc_url).await?;
        Ok(Self::new(provider, contracts))
    }

    pub fn new(provider: WsProvider, contracts: ContractAddresses) -> Self {
        Self {
            provider,
            contracts,
        }
    }

    fn governor(&self) -> GovernorAlpha::GovernorAlphaInstance<PubSubFrontend, WsProvider> {
        GovernorAlpha::new(self.contracts.governor, self.provider.clone())
    }
}

#[async_trait]
impl ChainApi for AlloyChainApi {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number), false)
            .await?
            .ok_or_else(|| eyre!("Block {} not found", block_number))?;
        Ok(block.header.timestamp)
    }

    async fn voting_delay(&self) -> Result<u64> {
        let delay = self.governor().votingDelay().call().await?;
        Ok(delay._0.saturating_to())
    }

    async fn voting_period(&self) -> Result<u64> {
        let period = self.governor().votingPeriod().call().await?;
        Ok(period._0.saturating_to())
    }

    async fn proposal_count(&self) -> Result<u64> {
        let count = self.governor().proposalCount().call().await?;
        Ok(count._0.saturating_to())
    }

    async fn proposal(&self, id: u64) -> Result<Proposal> {
        let p = self
            .governor()
            .proposals(U256::from(id))
            .call()
            .await
            .wrap_err_with(|| format!("Failed to read proposal {}", id))?;
        Ok(Proposal {
            id: p.id.saturating_to(),
            proposer: p.proposer.to_checksum(None),
            start_block: p.startBlock.saturating_to(),
            end_block: p.endBlock.saturating_to(),
            eta: p.eta.saturating_to(),
            canceled: p.canceled,
            executed: p.executed,
            for_votes: p.forVotes.to_string(),
            against_votes: p.againstVotes.to_string(),
        })
    }

    async fn proposal_state(&self, id: u64) -> Result<ProposalState> {
        let state = self
            .governor()
            .state(U256::from(id))
            .call()
            .await
            .wrap_err_with(|| format!("Failed to read state of proposal {}", id))?;
        Ok(ProposalState::try_from(state._0)?)
    }

    async fn subscribe_events(&self, contract: ContractKind) -> Result<RawEventStream> {
        let filter = Filter::new()
            .address(self.contracts.get(contract))
            .from_block(BlockNumberOrTag::Latest);

        let sub = self
            .provider
            .subscribe_logs(&filter)
            .await
            .wrap_err_with(|| format!("Failed to subscribe to {} logs", contract))?;

        let stream = sub
            .into_stream()
            .filter_map(move |log| future::ready(decode::live_event(contract, &log)));
        Ok(stream.boxed())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::UnknownProposalState;

/// Untyped argument bag of a raw contract event, keyed by Solidity parameter name.
pub type RawArgs = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Token,
    Governance,
    Timelock,
}

impl ContractKind {
    pub const ALL: [ContractKind; 3] = [
        ContractKind::Token,
        ContractKind::Governance,
        ContractKind::Timelock,
    ];
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::Token => "token",
            ContractKind::Governance => "governance",
            ContractKind::Timelock => "timelock",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Token
    Approval,
    DelegateChanged,
    DelegateVotesChanged,
    Transfer,
    // Governance
    ProposalCreated,
    ProposalCanceled,
    ProposalQueued,
    ProposalExecuted,
    VoteCast,
    // Timelock
    QueueTransaction,
    CancelTransaction,
    ExecuteTransaction,
    NewAdmin,
    NewPendingAdmin,
    NewDelay,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        EventKind::Approval,
        EventKind::DelegateChanged,
        EventKind::DelegateVotesChanged,
        EventKind::Transfer,
        EventKind::ProposalCreated,
        EventKind::ProposalCanceled,
        EventKind::ProposalQueued,
        EventKind::ProposalExecuted,
        EventKind::VoteCast,
        EventKind::QueueTransaction,
        EventKind::CancelTransaction,
        EventKind::ExecuteTransaction,
        EventKind::NewAdmin,
        EventKind::NewPendingAdmin,
        EventKind::NewDelay,
    ];

    /// Event name as emitted by the contract.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Approval => "Approval",
            EventKind::DelegateChanged => "DelegateChanged",
            EventKind::DelegateVotesChanged => "DelegateVotesChanged",
            EventKind::Transfer => "Transfer",
            EventKind::ProposalCreated => "ProposalCreated",
            EventKind::ProposalCanceled => "ProposalCanceled",
            EventKind::ProposalQueued => "ProposalQueued",
            EventKind::ProposalExecuted => "ProposalExecuted",
            EventKind::VoteCast => "VoteCast",
            EventKind::QueueTransaction => "QueueTransaction",
            EventKind::CancelTransaction => "CancelTransaction",
            EventKind::ExecuteTransaction => "ExecuteTransaction",
            EventKind::NewAdmin => "NewAdmin",
            EventKind::NewPendingAdmin => "NewPendingAdmin",
            EventKind::NewDelay => "NewDelay",
        }
    }

    pub fn contract(&self) -> ContractKind {
        match self {
            EventKind::Approval
            | EventKind::DelegateChanged
            | EventKind::DelegateVotesChanged
            | EventKind::Transfer => ContractKind::Token,
            EventKind::ProposalCreated
            | EventKind::ProposalCanceled
            | EventKind::ProposalQueued
            | EventKind::ProposalExecuted
            | EventKind::VoteCast => ContractKind::Governance,
            EventKind::QueueTransaction
            | EventKind::CancelTransaction
            | EventKind::ExecuteTransaction
            | EventKind::NewAdmin
            | EventKind::NewPendingAdmin
            | EventKind::NewDelay => ContractKind::Timelock,
        }
    }

    /// The chain entity this kind of event creates, updates or completes, if any.
    pub fn entity(&self) -> Option<(EntityKind, EntityEventKind)> {
        match self {
            EventKind::ProposalCreated => Some((EntityKind::Proposal, EntityEventKind::Create)),
            EventKind::ProposalQueued => Some((EntityKind::Proposal, EntityEventKind::Update)),
            EventKind::VoteCast => Some((EntityKind::Proposal, EntityEventKind::Vote)),
            EventKind::ProposalCanceled | EventKind::ProposalExecuted => {
                Some((EntityKind::Proposal, EntityEventKind::Complete))
            }
            EventKind::Approval
            | EventKind::DelegateChanged
            | EventKind::DelegateVotesChanged
            | EventKind::Transfer
            | EventKind::QueueTransaction
            | EventKind::CancelTransaction
            | EventKind::ExecuteTransaction
            | EventKind::NewAdmin
            | EventKind::NewPendingAdmin
            | EventKind::NewDelay => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Proposal,
}

impl EntityKind {
    /// Payload field that identifies the entity.
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Proposal => "id",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityEventKind {
    Create,
    Update,
    Vote,
    Complete,
}

pub fn is_entity_completed(events: &[ChainEvent]) -> bool {
    events.iter().any(|event| {
        matches!(
            event.data.kind().entity(),
            Some((_, EntityEventKind::Complete))
        )
    })
}

// Token payloads

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub owner: String,
    pub spender: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DelegateChanged {
    pub delegator: String,
    pub to_delegate: String,
    pub from_delegate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DelegateVotesChanged {
    pub delegate: String,
    pub previous_balance: String,
    pub new_balance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: String,
}

// Governance payloads

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalCreated {
    pub id: u64,
    pub proposer: String,
    pub targets: Vec<String>,
    pub values: Vec<String>,
    pub signatures: Vec<String>,
    pub calldatas: Vec<String>,
    pub start_block: u64,
    pub end_block: u64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalCanceled {
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalQueued {
    pub id: u64,
    pub eta: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalExecuted {
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
    pub voter: String,
    pub id: u64,
    pub support: bool,
    pub votes: String,
}

// Timelock payloads

/// Shared by queued, cancelled and executed timelock transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimelockTransaction {
    pub tx_hash: String,
    pub target: String,
    pub value: String,
    pub signature: String,
    pub data: String,
    pub eta: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmin {
    pub new_admin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPendingAdmin {
    pub new_pending_admin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewDelay {
    pub new_delay: u64,
}

/// Kind-tagged payload of a canonical event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum EventData {
    Approval(Approval),
    DelegateChanged(DelegateChanged),
    DelegateVotesChanged(DelegateVotesChanged),
    Transfer(Transfer),
    ProposalCreated(ProposalCreated),
    ProposalCanceled(ProposalCanceled),
    ProposalQueued(ProposalQueued),
    ProposalExecuted(ProposalExecuted),
    VoteCast(VoteCast),
    QueueTransaction(TimelockTransaction),
    CancelTransaction(TimelockTransaction),
    ExecuteTransaction(TimelockTransaction),
    NewAdmin(NewAdmin),
    NewPendingAdmin(NewPendingAdmin),
    NewDelay(NewDelay),
}

impl EventData {
    pub fn kind(&self) -> EventKind {
        match self {
            EventData::Approval(_) => EventKind::Approval,
            EventData::DelegateChanged(_) => EventKind::DelegateChanged,
            EventData::DelegateVotesChanged(_) => EventKind::DelegateVotesChanged,
            EventData::Transfer(_) => EventKind::Transfer,
            EventData::ProposalCreated(_) => EventKind::ProposalCreated,
            EventData::ProposalCanceled(_) => EventKind::ProposalCanceled,
            EventData::ProposalQueued(_) => EventKind::ProposalQueued,
            EventData::ProposalExecuted(_) => EventKind::ProposalExecuted,
            EventData::VoteCast(_) => EventKind::VoteCast,
            EventData::QueueTransaction(_) => EventKind::QueueTransaction,
            EventData::CancelTransaction(_) => EventKind::CancelTransaction,
            EventData::ExecuteTransaction(_) => EventKind::ExecuteTransaction,
            EventData::NewAdmin(_) => EventKind::NewAdmin,
            EventData::NewPendingAdmin(_) => EventKind::NewPendingAdmin,
            EventData::NewDelay(_) => EventKind::NewDelay,
        }
    }
}

/// Contract-agnostic event handed to the handler chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub block_number: u64,
    /// Actors of the event, who should not be notified about it.
    pub exclude_addresses: Vec<String>,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub event_name: String,
    pub block_number: u64,
    pub args: RawArgs,
}

/// Snapshot of a proposal as stored by the governance contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: u64,
    pub proposer: String,
    pub start_block: u64,
    pub end_block: u64,
    pub eta: u64,
    pub canceled: bool,
    pub executed: bool,
    pub for_votes: String,
    pub against_votes: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

impl TryFrom<u8> for ProposalState {
    type Error = UnknownProposalState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProposalState::Pending),
            1 => Ok(ProposalState::Active),
            2 => Ok(ProposalState::Canceled),
            3 => Ok(ProposalState::Defeated),
            4 => Ok(ProposalState::Succeeded),
            5 => Ok(ProposalState::Queued),
            6 => Ok(ProposalState::Expired),
            7 => Ok(ProposalState::Executed),
            other => Err(UnknownProposalState(other)),
        }
    }
}

/// Block interval believed to have been missed while offline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedRange {
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub max_results: Option<usize>,
}

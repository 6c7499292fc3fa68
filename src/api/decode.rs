use alloy::hex;
use alloy::primitives::{Address, Bytes, Log, B256, U256};
use alloy::rpc::types::Log as RpcLog;
use alloy::sol_types::SolEvent;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::contracts::{GovernanceToken, GovernorAlpha, Timelock};
use crate::events::{ContractKind, RawArgs, RawEvent};

/// Decodes a log emitted by one of the watched contracts into a raw event.
/// Logs with an unknown signature or undecodable data yield `None`.
pub fn raw_event(contract: ContractKind, block_number: u64, log: &Log) -> Option<RawEvent> {
    let signature = *log.topics().first()?;
    let decoded = match contract {
        ContractKind::Token => token_event(signature, log),
        ContractKind::Governance => governance_event(signature, log),
        ContractKind::Timelock => timelock_event(signature, log),
    };

    let Some((event_name, args)) = decoded else {
        debug!("Unknown {} event signature: {:?}", contract, signature);
        return None;
    };

    Some(RawEvent {
        event_name: event_name.to_string(),
        block_number,
        args: into_args(args),
    })
}

/// Decodes a log delivered by a live subscription. Logs dropped by a chain
/// reorg (`removed`) yield `None`.
pub fn live_event(contract: ContractKind, log: &RpcLog) -> Option<RawEvent> {
    if log.removed {
        debug!(
            "Ignoring removed {} log at block {:?}",
            contract, log.block_number
        );
        return None;
    }
    raw_event(contract, log.block_number.unwrap_or_default(), &log.inner)
}

fn token_event(signature: B256, log: &Log) -> Option<(&'static str, Value)> {
    if signature == GovernanceToken::Approval::SIGNATURE_HASH {
        let e = decode::<GovernanceToken::Approval>(log)?;
        Some((
            "Approval",
            json!({
                "owner": checksummed(&e.owner),
                "spender": checksummed(&e.spender),
                "amount": e.amount.to_string(),
            }),
        ))
    } else if signature == GovernanceToken::DelegateChanged::SIGNATURE_HASH {
        let e = decode::<GovernanceToken::DelegateChanged>(log)?;
        Some((
            "DelegateChanged",
            json!({
                "delegator": checksummed(&e.delegator),
                "fromDelegate": checksummed(&e.fromDelegate),
                "toDelegate": checksummed(&e.toDelegate),
            }),
        ))
    } else if signature == GovernanceToken::DelegateVotesChanged::SIGNATURE_HASH {
        let e = decode::<GovernanceToken::DelegateVotesChanged>(log)?;
        Some((
            "DelegateVotesChanged",
            json!({
                "delegate": checksummed(&e.delegate),
                "previousBalance": e.previousBalance.to_string(),
                "newBalance": e.newBalance.to_string(),
            }),
        ))
    } else if signature == GovernanceToken::Transfer::SIGNATURE_HASH {
        let e = decode::<GovernanceToken::Transfer>(log)?;
        Some((
            "Transfer",
            json!({
                "from": checksummed(&e.from),
                "to": checksummed(&e.to),
                "amount": e.amount.to_string(),
            }),
        ))
    } else {
        None
    }
}

fn governance_event(
    signature: B256,
    log: &Log,
) -> Option<(&'static str, Value)> {
    if signature == GovernorAlpha::ProposalCreated::SIGNATURE_HASH {
        let e = decode::<GovernorAlpha::ProposalCreated>(log)?;
        Some((
            "ProposalCreated",
            json!({
                "id": e.id.to_string(),
                "proposer": checksummed(&e.proposer),
                "targets": e.targets.iter().map(checksummed).collect::<Vec<_>>(),
                "values": e.values.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                "signatures": e.signatures,
                "calldatas": e.calldatas.iter().map(hex::encode_prefixed).collect::<Vec<_>>(),
                "startBlock": e.startBlock.to_string(),
                "endBlock": e.endBlock.to_string(),
                "description": e.description,
            }),
        ))
    } else if signature == GovernorAlpha::VoteCast::SIGNATURE_HASH {
        let e = decode::<GovernorAlpha::VoteCast>(log)?;
        Some((
            "VoteCast",
            json!({
                "voter": checksummed(&e.voter),
                "proposalId": e.proposalId.to_string(),
                "support": e.support,
                "votes": e.votes.to_string(),
            }),
        ))
    } else if signature == GovernorAlpha::ProposalCanceled::SIGNATURE_HASH {
        let e = decode::<GovernorAlpha::ProposalCanceled>(log)?;
        Some(("ProposalCanceled", json!({ "id": e.id.to_string() })))
    } else if signature == GovernorAlpha::ProposalQueued::SIGNATURE_HASH {
        let e = decode::<GovernorAlpha::ProposalQueued>(log)?;
        Some((
            "ProposalQueued",
            json!({ "id": e.id.to_string(), "eta": e.eta.to_string() }),
        ))
    } else if signature == GovernorAlpha::ProposalExecuted::SIGNATURE_HASH {
        let e = decode::<GovernorAlpha::ProposalExecuted>(log)?;
        Some(("ProposalExecuted", json!({ "id": e.id.to_string() })))
    } else {
        None
    }
}

fn timelock_event(signature: B256, log: &Log) -> Option<(&'static str, Value)> {
    if signature == Timelock::NewAdmin::SIGNATURE_HASH {
        let e = decode::<Timelock::NewAdmin>(log)?;
        Some(("NewAdmin", json!({ "newAdmin": checksummed(&e.newAdmin) })))
    } else if signature == Timelock::NewPendingAdmin::SIGNATURE_HASH {
        let e = decode::<Timelock::NewPendingAdmin>(log)?;
        Some((
            "NewPendingAdmin",
            json!({ "newPendingAdmin": checksummed(&e.newPendingAdmin) }),
        ))
    } else if signature == Timelock::NewDelay::SIGNATURE_HASH {
        let e = decode::<Timelock::NewDelay>(log)?;
        Some(("NewDelay", json!({ "newDelay": e.newDelay.to_string() })))
    } else if signature == Timelock::QueueTransaction::SIGNATURE_HASH {
        let e = decode::<Timelock::QueueTransaction>(log)?;
        Some((
            "QueueTransaction",
            transaction_args(&e.txHash, &e.target, &e.value, &e.signature, &e.data, &e.eta),
        ))
    } else if signature == Timelock::CancelTransaction::SIGNATURE_HASH {
        let e = decode::<Timelock::CancelTransaction>(log)?;
        Some((
            "CancelTransaction",
            transaction_args(&e.txHash, &e.target, &e.value, &e.signature, &e.data, &e.eta),
        ))
    } else if signature == Timelock::ExecuteTransaction::SIGNATURE_HASH {
        let e = decode::<Timelock::ExecuteTransaction>(log)?;
        Some((
            "ExecuteTransaction",
            transaction_args(&e.txHash, &e.target, &e.value, &e.signature, &e.data, &e.eta),
        ))
    } else {
        None
    }
}

fn transaction_args(
    tx_hash: &B256,
    target: &Address,
    value: &U256,
    signature: &str,
    data: &Bytes,
    eta: &U256,
) -> Value {
    json!({
        "txHash": hex::encode_prefixed(tx_hash),
        "target": checksummed(target),
        "value": value.to_string(),
        "signature": signature,
        "data": hex::encode_prefixed(data),
        "eta": eta.to_string(),
    })
}

fn decode<E: SolEvent>(log: &Log) -> Option<E> {
    match E::decode_log(log, true) {
        Ok(decoded) => Some(decoded.data),
        Err(e) => {
            warn!("Failed to decode {} log: {}", E::SIGNATURE, e);
            None
        }
    }
}

fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}

fn into_args(value: Value) -> RawArgs {
    match value {
        Value::Object(map) => map,
        _ => RawArgs::new(),
    }
}

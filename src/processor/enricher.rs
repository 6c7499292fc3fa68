use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{ArgError, EnrichmentError};
use crate::events::{
    Approval, ChainEvent, DelegateChanged, DelegateVotesChanged, EventData, EventKind, NewAdmin,
    NewDelay, NewPendingAdmin, ProposalCanceled, ProposalCreated, ProposalExecuted,
    ProposalQueued, RawArgs, TimelockTransaction, Transfer, VoteCast,
};

/// Shapes the raw arguments of a classified event into its canonical form.
///
/// Each kind reads exactly the fields its contract event carries. A missing
/// or malformed field fails the whole event; nothing partial is emitted.
pub fn enrich(
    block_number: u64,
    kind: EventKind,
    args: &RawArgs,
) -> Result<ChainEvent, EnrichmentError> {
    let (exclude_addresses, data) =
        shape(kind, Args(args)).map_err(|source| EnrichmentError { kind, source })?;
    Ok(ChainEvent {
        block_number,
        exclude_addresses,
        data,
    })
}

fn shape(kind: EventKind, args: Args<'_>) -> Result<(Vec<String>, EventData), ArgError> {
    let shaped = match kind {
        EventKind::Approval => {
            let owner = args.address("owner")?;
            let data = EventData::Approval(Approval {
                owner: owner.clone(),
                spender: args.address("spender")?,
                amount: args.amount("amount")?,
            });
            (vec![owner], data)
        }
        EventKind::DelegateChanged => {
            let delegator = args.address("delegator")?;
            let data = EventData::DelegateChanged(DelegateChanged {
                delegator: delegator.clone(),
                to_delegate: args.address("toDelegate")?,
                from_delegate: args.address("fromDelegate")?,
            });
            (vec![delegator], data)
        }
        EventKind::DelegateVotesChanged => (
            vec![],
            EventData::DelegateVotesChanged(DelegateVotesChanged {
                delegate: args.address("delegate")?,
                previous_balance: args.amount("previousBalance")?,
                new_balance: args.amount("newBalance")?,
            }),
        ),
        EventKind::Transfer => {
            let from = args.address("from")?;
            let data = EventData::Transfer(Transfer {
                from: from.clone(),
                to: args.address("to")?,
                amount: args.amount("amount")?,
            });
            (vec![from], data)
        }
        EventKind::ProposalCreated => {
            let proposer = args.address("proposer")?;
            let data = EventData::ProposalCreated(ProposalCreated {
                id: args.uint("id")?,
                proposer: proposer.clone(),
                targets: args.list("targets", "an address", as_address)?,
                values: args.list("values", "an unsigned integer", as_amount)?,
                signatures: args.list("signatures", "a string", as_string)?,
                calldatas: args.list("calldatas", "hex bytes", as_bytes)?,
                start_block: args.uint("startBlock")?,
                end_block: args.uint("endBlock")?,
                description: args.string("description")?,
            });
            (vec![proposer], data)
        }
        EventKind::ProposalCanceled => (
            vec![],
            EventData::ProposalCanceled(ProposalCanceled {
                id: args.uint("id")?,
            }),
        ),
        EventKind::ProposalQueued => (
            vec![],
            EventData::ProposalQueued(ProposalQueued {
                id: args.uint("id")?,
                eta: args.uint("eta")?,
            }),
        ),
        EventKind::ProposalExecuted => (
            vec![],
            EventData::ProposalExecuted(ProposalExecuted {
                id: args.uint("id")?,
            }),
        ),
        EventKind::VoteCast => {
            let voter = args.address("voter")?;
            let data = EventData::VoteCast(VoteCast {
                voter: voter.clone(),
                id: args.uint("proposalId")?,
                support: args.boolean("support")?,
                votes: args.amount("votes")?,
            });
            (vec![voter], data)
        }
        EventKind::QueueTransaction => (vec![], EventData::QueueTransaction(args.transaction()?)),
        EventKind::CancelTransaction => {
            (vec![], EventData::CancelTransaction(args.transaction()?))
        }
        EventKind::ExecuteTransaction => {
            (vec![], EventData::ExecuteTransaction(args.transaction()?))
        }
        EventKind::NewAdmin => (
            vec![],
            EventData::NewAdmin(NewAdmin {
                new_admin: args.address("newAdmin")?,
            }),
        ),
        EventKind::NewPendingAdmin => (
            vec![],
            EventData::NewPendingAdmin(NewPendingAdmin {
                new_pending_admin: args.address("newPendingAdmin")?,
            }),
        ),
        EventKind::NewDelay => (
            vec![],
            EventData::NewDelay(NewDelay {
                new_delay: args.uint("newDelay")?,
            }),
        ),
    };
    Ok(shaped)
}

#[derive(Clone, Copy)]
struct Args<'a>(&'a RawArgs);

impl<'a> Args<'a> {
    fn get(&self, field: &'static str) -> Result<&'a Value, ArgError> {
        match self.0.get(field) {
            None | Some(Value::Null) => Err(ArgError::Missing(field)),
            Some(value) => Ok(value),
        }
    }

    fn field<T>(
        &self,
        field: &'static str,
        expected: &'static str,
        read: fn(&Value) -> Option<T>,
    ) -> Result<T, ArgError> {
        read(self.get(field)?).ok_or(ArgError::Malformed { field, expected })
    }

    fn address(&self, field: &'static str) -> Result<String, ArgError> {
        self.field(field, "an address", as_address)
    }

    fn amount(&self, field: &'static str) -> Result<String, ArgError> {
        self.field(field, "an unsigned integer", as_amount)
    }

    fn uint(&self, field: &'static str) -> Result<u64, ArgError> {
        self.field(field, "a 64-bit unsigned integer", as_u64)
    }

    fn boolean(&self, field: &'static str) -> Result<bool, ArgError> {
        self.field(field, "a boolean", Value::as_bool)
    }

    fn string(&self, field: &'static str) -> Result<String, ArgError> {
        self.field(field, "a string", as_string)
    }

    fn list(
        &self,
        field: &'static str,
        expected: &'static str,
        read: fn(&Value) -> Option<String>,
    ) -> Result<Vec<String>, ArgError> {
        let items = self
            .get(field)?
            .as_array()
            .ok_or(ArgError::Malformed { field, expected: "a list" })?;
        items
            .iter()
            .map(|item| read(item).ok_or(ArgError::Malformed { field, expected }))
            .collect()
    }

    fn transaction(&self) -> Result<TimelockTransaction, ArgError> {
        Ok(TimelockTransaction {
            tx_hash: self.field("txHash", "a 32-byte hash", as_hash)?,
            target: self.address("target")?,
            value: self.amount("value")?,
            signature: self.string("signature")?,
            data: self.field("data", "hex bytes", as_bytes)?,
            eta: self.uint("eta")?,
        })
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn as_address(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    Address::from_str(s).ok().map(|_| s.to_owned())
}

fn as_hash(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    B256::from_str(s).ok().map(|_| s.to_owned())
}

fn as_bytes(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    Bytes::from_str(s).ok().map(|_| s.to_owned())
}

/// uint256 values arrive as decimal (or 0x) strings, small ones sometimes as numbers.
fn as_amount(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => U256::from_str(s).ok().map(|n| n.to_string()),
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let n = U256::from_str(s).ok()?;
            u64::try_from(n).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALICE: &str = "0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1";
    const BOB: &str = "0xFFcf8FDEE72ac11b5c542428B35EEF5769C409f0";
    const ZERO: &str = "0x0000000000000000000000000000000000000000";
    const HASH: &str = "0x5c6d8f0e3f7f6fb5a4d2c7a9f0e1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3";

    fn args(value: serde_json::Value) -> RawArgs {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("args must be an object"),
        }
    }

    fn timelock_args() -> RawArgs {
        args(json!({
            "txHash": HASH,
            "target": BOB,
            "value": "0",
            "signature": "setPendingAdmin(address)",
            "data": "0x00000000000000000000000090f8bf6a479f320ead074411a4b0e7944ea8c9c1",
            "eta": 1_700_000_000u64,
        }))
    }

    /// One valid argument bag per kind.
    fn sample(kind: EventKind) -> RawArgs {
        match kind {
            EventKind::Approval => args(json!({ "owner": ALICE, "spender": BOB, "amount": "100" })),
            EventKind::DelegateChanged => args(json!({
                "delegator": ALICE, "fromDelegate": ZERO, "toDelegate": BOB
            })),
            EventKind::DelegateVotesChanged => args(json!({
                "delegate": BOB, "previousBalance": "0", "newBalance": "1000"
            })),
            EventKind::Transfer => args(json!({ "from": ALICE, "to": BOB, "amount": "100" })),
            EventKind::ProposalCreated => args(json!({
                "id": "1",
                "proposer": ALICE,
                "targets": [BOB],
                "values": ["0"],
                "signatures": ["_setCollateralFactor(address,uint256)"],
                "calldatas": ["0x0853a0d2313c0000"],
                "startBlock": "10",
                "endBlock": 17290,
                "description": "test description",
            })),
            EventKind::ProposalCanceled | EventKind::ProposalExecuted => args(json!({ "id": 1 })),
            EventKind::ProposalQueued => args(json!({ "id": 1, "eta": 1_700_000_000u64 })),
            EventKind::VoteCast => args(json!({
                "voter": BOB, "proposalId": "1", "support": true, "votes": "1000"
            })),
            EventKind::QueueTransaction
            | EventKind::CancelTransaction
            | EventKind::ExecuteTransaction => timelock_args(),
            EventKind::NewAdmin => args(json!({ "newAdmin": BOB })),
            EventKind::NewPendingAdmin => args(json!({ "newPendingAdmin": BOB })),
            EventKind::NewDelay => args(json!({ "newDelay": 172800 })),
        }
    }

    #[test]
    fn every_kind_enriches_to_its_own_payload() {
        for kind in EventKind::ALL {
            let event = enrich(42, kind, &sample(kind)).unwrap();
            assert_eq!(event.block_number, 42);
            assert_eq!(event.data.kind(), kind);
        }
    }

    #[test]
    fn delegate_changed_excludes_delegator() {
        let event = enrich(7, EventKind::DelegateChanged, &sample(EventKind::DelegateChanged))
            .unwrap();
        assert_eq!(event.exclude_addresses, vec![ALICE.to_string()]);
        assert_eq!(
            event.data,
            EventData::DelegateChanged(DelegateChanged {
                delegator: ALICE.into(),
                to_delegate: BOB.into(),
                from_delegate: ZERO.into(),
            })
        );
    }

    #[test]
    fn queued_proposal_has_no_actor() {
        let event = enrich(7, EventKind::ProposalQueued, &sample(EventKind::ProposalQueued))
            .unwrap();
        assert!(event.exclude_addresses.is_empty());
        assert_eq!(
            event.data,
            EventData::ProposalQueued(ProposalQueued {
                id: 1,
                eta: 1_700_000_000
            })
        );
    }

    #[test]
    fn proposal_created_accepts_numbers_and_strings() {
        let event = enrich(5, EventKind::ProposalCreated, &sample(EventKind::ProposalCreated))
            .unwrap();
        let EventData::ProposalCreated(created) = event.data else {
            panic!("wrong payload");
        };
        assert_eq!(created.id, 1);
        assert_eq!(created.start_block, 10);
        assert_eq!(created.end_block, 17290);
        assert_eq!(created.targets, vec![BOB.to_string()]);
        assert_eq!(event.exclude_addresses, vec![ALICE.to_string()]);
    }

    #[test]
    fn enrichment_is_repeatable() {
        for kind in EventKind::ALL {
            let raw = sample(kind);
            assert_eq!(enrich(9, kind, &raw), enrich(9, kind, &raw));
        }
    }

    #[test]
    fn missing_field_fails_the_event() {
        let raw = args(json!({ "from": ALICE, "to": BOB }));
        let err = enrich(1, EventKind::Transfer, &raw).unwrap_err();
        assert_eq!(err.kind, EventKind::Transfer);
        assert_eq!(err.source, ArgError::Missing("amount"));
    }

    #[test]
    fn null_counts_as_missing() {
        let raw = args(json!({ "newAdmin": null }));
        let err = enrich(1, EventKind::NewAdmin, &raw).unwrap_err();
        assert_eq!(err.source, ArgError::Missing("newAdmin"));
    }

    #[test]
    fn malformed_field_fails_the_event() {
        let raw = args(json!({ "owner": "not-an-address", "spender": BOB, "amount": "1" }));
        let err = enrich(1, EventKind::Approval, &raw).unwrap_err();
        assert!(matches!(
            err.source,
            ArgError::Malformed { field: "owner", .. }
        ));

        let raw = args(json!({ "voter": BOB, "proposalId": 1, "support": "yes", "votes": "1" }));
        let err = enrich(1, EventKind::VoteCast, &raw).unwrap_err();
        assert!(matches!(
            err.source,
            ArgError::Malformed { field: "support", .. }
        ));
    }

    #[test]
    fn malformed_list_item_fails_the_event() {
        let mut raw = sample(EventKind::ProposalCreated);
        raw.insert("calldatas".into(), json!(["0xzz"]));
        let err = enrich(1, EventKind::ProposalCreated, &raw).unwrap_err();
        assert!(matches!(
            err.source,
            ArgError::Malformed { field: "calldatas", .. }
        ));
    }

    #[test]
    fn hex_amounts_are_normalized_to_decimal() {
        let raw = args(json!({ "from": ALICE, "to": BOB, "amount": "0x64" }));
        let event = enrich(1, EventKind::Transfer, &raw).unwrap();
        let EventData::Transfer(transfer) = event.data else {
            panic!("wrong payload");
        };
        assert_eq!(transfer.amount, "100");
    }
}

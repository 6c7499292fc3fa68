//! Human-readable summaries of events, used for notifications.

mod titler;

pub use titler::{title, EventTitle};

use serde::Serialize;

use crate::events::EventData;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventLabel {
    pub heading: String,
    pub label: String,
    pub link_url: Option<String>,
}

fn proposal_link(chain_id: Option<&str>, id: u64) -> Option<String> {
    chain_id.map(|chain| format!("/{}/proposal/governorproposal/{}", chain, id))
}

/// Describes a single event. `chain_id` is only used to build the proposal
/// link; without it no link is produced.
pub fn label(chain_id: Option<&str>, data: &EventData) -> EventLabel {
    let (heading, label, link_url) = match data {
        EventData::Approval(e) => (
            "Approval",
            format!("{} approved {} to spend {}.", e.owner, e.spender, e.amount),
            None,
        ),
        EventData::DelegateChanged(e) => (
            "Delegate Changed",
            format!(
                "User {} delegated from {} to {}.",
                e.delegator, e.from_delegate, e.to_delegate
            ),
            None,
        ),
        EventData::DelegateVotesChanged(e) => (
            "Delegate Votes Changed",
            format!(
                "Delegate {} changed votes from {} to {}.",
                e.delegate, e.previous_balance, e.new_balance
            ),
            None,
        ),
        EventData::Transfer(e) => (
            "Transfer Occurred",
            format!("{} transferred {} to {}.", e.from, e.amount, e.to),
            None,
        ),
        EventData::ProposalCreated(e) => (
            "Proposal Created",
            format!("Proposal {} was created by {}.", e.id, e.proposer),
            proposal_link(chain_id, e.id),
        ),
        EventData::ProposalCanceled(e) => (
            "Proposal Canceled",
            format!("Proposal {} was cancelled.", e.id),
            proposal_link(chain_id, e.id),
        ),
        EventData::ProposalQueued(e) => (
            "Proposal Queued",
            format!("Proposal {} queued up. ETA: {}.", e.id, e.eta),
            proposal_link(chain_id, e.id),
        ),
        EventData::ProposalExecuted(e) => (
            "Proposal Executed",
            format!("Proposal {} was executed.", e.id),
            proposal_link(chain_id, e.id),
        ),
        EventData::VoteCast(e) => (
            "Vote Cast",
            format!(
                "Voter ({}) cast {} votes {}in support of proposal {}.",
                e.voter,
                e.votes,
                if e.support { "" } else { "not " },
                e.id
            ),
            proposal_link(chain_id, e.id),
        ),
        EventData::QueueTransaction(e) => (
            "Transaction Queued",
            format!("Transaction {} was queued. ETA: {}.", e.tx_hash, e.eta),
            None,
        ),
        EventData::CancelTransaction(e) => (
            "Transaction Cancelled",
            format!("Transaction {} was cancelled.", e.tx_hash),
            None,
        ),
        EventData::ExecuteTransaction(e) => (
            "Transaction Executed",
            format!(
                "Transaction {} was executed. {} was transferred to {}.",
                e.tx_hash, e.value, e.target
            ),
            None,
        ),
        EventData::NewAdmin(e) => (
            "New Admin",
            format!("Admin {} now in control.", e.new_admin),
            None,
        ),
        EventData::NewPendingAdmin(e) => (
            "New Pending Admin",
            format!("New pending admin ({}).", e.new_pending_admin),
            None,
        ),
        EventData::NewDelay(e) => (
            "New Delay",
            format!("Time delay changed to {} seconds.", e.new_delay),
            None,
        ),
    };

    EventLabel {
        heading: heading.to_string(),
        label,
        link_url,
    }
}

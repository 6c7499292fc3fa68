use serde::Serialize;

use crate::events::EventKind;

/// Generic description of a subscribable event category.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventTitle {
    pub title: &'static str,
    pub description: &'static str,
}

pub fn title(kind: EventKind) -> EventTitle {
    let (title, description) = match kind {
        EventKind::Approval => ("Approval", "A token spending allowance is approved."),
        EventKind::DelegateChanged => ("Delegate Changed", "A user changes their delegate."),
        EventKind::DelegateVotesChanged => (
            "Delegate Votes Changed",
            "A delegate's voting power changes.",
        ),
        EventKind::Transfer => ("Transfer Occurred", "Tokens are transferred between accounts."),
        EventKind::ProposalCreated => ("Proposal Created", "A new proposal is created."),
        EventKind::ProposalCanceled => ("Proposal Canceled", "A proposal is cancelled."),
        EventKind::ProposalQueued => (
            "Proposal Queued",
            "A proposal is queued for execution in the timelock.",
        ),
        EventKind::ProposalExecuted => ("Proposal Executed", "A proposal is executed."),
        EventKind::VoteCast => ("Vote Cast", "A vote is cast on a proposal."),
        EventKind::QueueTransaction => (
            "Transaction Queued",
            "A transaction is queued in the timelock.",
        ),
        EventKind::CancelTransaction => (
            "Transaction Cancelled",
            "A queued timelock transaction is cancelled.",
        ),
        EventKind::ExecuteTransaction => (
            "Transaction Executed",
            "A queued timelock transaction is executed.",
        ),
        EventKind::NewAdmin => ("New Admin", "The timelock admin changes."),
        EventKind::NewPendingAdmin => (
            "New Pending Admin",
            "A new pending admin is set on the timelock.",
        ),
        EventKind::NewDelay => ("New Delay", "The timelock delay changes."),
    };
    EventTitle { title, description }
}

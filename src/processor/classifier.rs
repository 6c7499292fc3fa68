use crate::events::EventKind;

/// Maps an upstream event name to its kind. Names outside the three
/// contracts' ABIs yield `None`.
pub fn classify(event_name: &str) -> Option<EventKind> {
    let kind = match event_name {
        "Approval" => EventKind::Approval,
        "DelegateChanged" => EventKind::DelegateChanged,
        "DelegateVotesChanged" => EventKind::DelegateVotesChanged,
        "Transfer" => EventKind::Transfer,
        "ProposalCreated" => EventKind::ProposalCreated,
        "ProposalCanceled" => EventKind::ProposalCanceled,
        "ProposalQueued" => EventKind::ProposalQueued,
        "ProposalExecuted" => EventKind::ProposalExecuted,
        "VoteCast" => EventKind::VoteCast,
        "QueueTransaction" => EventKind::QueueTransaction,
        "CancelTransaction" => EventKind::CancelTransaction,
        "ExecuteTransaction" => EventKind::ExecuteTransaction,
        "NewAdmin" => EventKind::NewAdmin,
        "NewPendingAdmin" => EventKind::NewPendingAdmin,
        "NewDelay" => EventKind::NewDelay,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_names() {
        assert_eq!(classify("DelegateChanged"), Some(EventKind::DelegateChanged));
        assert_eq!(classify("NewPendingAdmin"), Some(EventKind::NewPendingAdmin));
    }

    #[test]
    fn unknown_names_are_not_errors() {
        assert_eq!(classify("NothingHappened"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("transfer"), None);
    }

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in EventKind::ALL {
            assert_eq!(classify(kind.as_str()), Some(kind));
        }
    }
}

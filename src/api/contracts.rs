use alloy::sol;

sol! {
    interface GovernanceToken {
        event Approval(address indexed owner, address indexed spender, uint256 amount);
        event DelegateChanged(address indexed delegator, address indexed fromDelegate, address indexed toDelegate);
        event DelegateVotesChanged(address indexed delegate, uint256 previousBalance, uint256 newBalance);
        event Transfer(address indexed from, address indexed to, uint256 amount);
    }

    #[sol(rpc)]
    interface GovernorAlpha {
        event ProposalCreated(uint256 id, address proposer, address[] targets, uint256[] values, string[] signatures, bytes[] calldatas, uint256 startBlock, uint256 endBlock, string description);
        event VoteCast(address voter, uint256 proposalId, bool support, uint256 votes);
        event ProposalCanceled(uint256 id);
        event ProposalQueued(uint256 id, uint256 eta);
        event ProposalExecuted(uint256 id);

        function votingDelay() external view returns (uint256);
        function votingPeriod() external view returns (uint256);
        function proposalCount() external view returns (uint256);
        function proposals(uint256 proposalId) external view returns (uint256 id, address proposer, uint256 eta, uint256 startBlock, uint256 endBlock, uint256 forVotes, uint256 againstVotes, bool canceled, bool executed);
        function state(uint256 proposalId) external view returns (uint8);
    }

    interface Timelock {
        event NewAdmin(address indexed newAdmin);
        event NewPendingAdmin(address indexed newPendingAdmin);
        event NewDelay(uint256 indexed newDelay);
        event CancelTransaction(bytes32 indexed txHash, address indexed target, uint256 value, string signature, bytes data, uint256 eta);
        event ExecuteTransaction(bytes32 indexed txHash, address indexed target, uint256 value, string signature, bytes data, uint256 eta);
        event QueueTransaction(bytes32 indexed txHash, address indexed target, uint256 value, string signature, bytes data, uint256 eta);
    }
}

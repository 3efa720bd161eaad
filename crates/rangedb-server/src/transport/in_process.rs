use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rangedb_core::NodeId;
use rangedb_raft::{RaftError, RaftMessage, RaftNode, RaftResult, RaftTransport, TransportFuture};

/// Delivers RPCs by calling the target [`RaftNode`]'s handlers directly,
/// skipping the network entirely. Used by integration tests that want a
/// real multi-node Raft group without standing up gRPC servers.
pub struct InProcessTransport {
    nodes: HashMap<NodeId, Arc<Mutex<RaftNode>>>,
}

impl InProcessTransport {
    pub fn new(nodes: HashMap<NodeId, Arc<Mutex<RaftNode>>>) -> Self {
        Self { nodes }
    }

    fn node(&self, peer: NodeId) -> RaftResult<Arc<Mutex<RaftNode>>> {
        self.nodes
            .get(&peer)
            .cloned()
            .ok_or(RaftError::NotLeader { leader_hint: None })
    }
}

impl RaftTransport for InProcessTransport {
    fn send_request_vote(&self, peer: NodeId, request: RaftMessage) -> TransportFuture<'_> {
        let node = self.node(peer);
        Box::pin(async move {
            let node = node?;
            let mut node = node.lock().expect("raft node mutex poisoned");
            Ok(node.handle_request_vote(&request))
        })
    }

    fn send_append_entries(&self, peer: NodeId, request: RaftMessage) -> TransportFuture<'_> {
        let node = self.node(peer);
        Box::pin(async move {
            let node = node?;
            let mut node = node.lock().expect("raft node mutex poisoned");
            Ok(node.handle_append_entries(&request))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangedb_raft::RaftConfig;

    #[tokio::test]
    async fn routes_request_vote_to_target_node() {
        let follower = Arc::new(Mutex::new(RaftNode::new(RaftConfig {
            node_id: NodeId::new(2),
            peers: vec![NodeId::new(1)],
            ..RaftConfig::default()
        })));
        let mut nodes = HashMap::new();
        nodes.insert(NodeId::new(2), follower);
        let transport = InProcessTransport::new(nodes);

        let request = RaftMessage::RequestVote {
            term: rangedb_core::Term::new(1),
            candidate: NodeId::new(1),
            last_log_index: rangedb_core::LogIndex::NONE,
            last_log_term: rangedb_core::Term::ZERO,
        };
        let response = transport.send_request_vote(NodeId::new(2), request).await.unwrap();
        assert!(matches!(response, RaftMessage::RequestVoteResponse { granted: true, .. }));
    }

    #[tokio::test]
    async fn unknown_peer_errors() {
        let transport = InProcessTransport::new(HashMap::new());
        let request = RaftMessage::RequestVote {
            term: rangedb_core::Term::new(1),
            candidate: NodeId::new(1),
            last_log_index: rangedb_core::LogIndex::NONE,
            last_log_term: rangedb_core::Term::ZERO,
        };
        assert!(transport.send_request_vote(NodeId::new(99), request).await.is_err());
    }
}

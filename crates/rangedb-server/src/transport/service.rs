use std::sync::{Arc, Mutex};

use rangedb_core::{LogIndex, NodeId, Term};
use rangedb_raft::{LogEntry, RaftMessage, RaftNode};
use tonic::{Request, Response, Status};

use super::grpc::pb;
use pb::raft_rpc_server::RaftRpc;

fn from_pb_entry(entry: pb::LogEntry) -> LogEntry {
    LogEntry { index: LogIndex::new(entry.index), term: Term::new(entry.term), command: entry.command }
}

/// The gRPC-facing side of a node: unwraps wire messages, feeds them to the
/// local [`RaftNode`], and re-wraps its response. One instance per node;
/// peers reach it through the client in [`super::grpc`].
pub struct RaftRpcService {
    node: Arc<Mutex<RaftNode>>,
}

impl RaftRpcService {
    pub fn new(node: Arc<Mutex<RaftNode>>) -> Self {
        Self { node }
    }
}

#[tonic::async_trait]
impl RaftRpc for RaftRpcService {
    async fn request_vote(
        &self,
        request: Request<pb::RequestVoteRequest>,
    ) -> Result<Response<pb::RequestVoteResponse>, Status> {
        let wire = request.into_inner();
        let msg = RaftMessage::RequestVote {
            term: Term::new(wire.term),
            candidate: NodeId::new(wire.candidate),
            last_log_index: LogIndex::new(wire.last_log_index),
            last_log_term: Term::new(wire.last_log_term),
        };
        let mut node = self.node.lock().expect("raft node mutex poisoned");
        let RaftMessage::RequestVoteResponse { term, granted } = node.handle_request_vote(&msg) else {
            unreachable!("handle_request_vote always returns RequestVoteResponse")
        };
        Ok(Response::new(pb::RequestVoteResponse { term: term.get(), granted }))
    }

    async fn append_entries(
        &self,
        request: Request<pb::AppendEntriesRequest>,
    ) -> Result<Response<pb::AppendEntriesResponse>, Status> {
        let wire = request.into_inner();
        let msg = RaftMessage::AppendEntries {
            term: Term::new(wire.term),
            leader: NodeId::new(wire.leader),
            prev_log_index: LogIndex::new(wire.prev_log_index),
            prev_log_term: Term::new(wire.prev_log_term),
            entries: wire.entries.into_iter().map(from_pb_entry).collect(),
            leader_commit: LogIndex::new(wire.leader_commit),
        };
        let mut node = self.node.lock().expect("raft node mutex poisoned");
        let RaftMessage::AppendEntriesResponse { term, success, last_log_index, conflict_index } =
            node.handle_append_entries(&msg)
        else {
            unreachable!("handle_append_entries always returns AppendEntriesResponse")
        };
        Ok(Response::new(pb::AppendEntriesResponse {
            term: term.get(),
            success,
            last_log_index: last_log_index.get(),
            conflict_index: conflict_index.map(|i| i.get()),
        }))
    }

    async fn install_snapshot(
        &self,
        _request: Request<pb::InstallSnapshotRequest>,
    ) -> Result<Response<pb::InstallSnapshotResponse>, Status> {
        Err(Status::unimplemented("snapshot transfer is reserved"))
    }
}

use std::collections::HashMap;

use rangedb_core::{LogIndex, NodeId, Term};
use rangedb_raft::{LogEntry, RaftError, RaftMessage, RaftResult, RaftTransport, TransportFuture};
use tonic::transport::Channel;
use tonic::Request;

pub mod pb {
    tonic::include_proto!("rangedb.raft");
}

use pb::raft_rpc_client::RaftRpcClient;

fn to_pb_entry(entry: &LogEntry) -> pb::LogEntry {
    pb::LogEntry { index: entry.index.get(), term: entry.term.get(), command: entry.command.clone() }
}

fn to_pb_message(msg: &RaftMessage) -> Result<pb::AppendEntriesRequest, ServerSide> {
    // Only ever called for AppendEntries from `send_append_entries`; kept as
    // a focused helper rather than a general enum-wide converter.
    match msg {
        RaftMessage::AppendEntries { term, leader, prev_log_index, prev_log_term, entries, leader_commit } => {
            Ok(pb::AppendEntriesRequest {
                term: term.get(),
                leader: leader.get(),
                prev_log_index: prev_log_index.get(),
                prev_log_term: prev_log_term.get(),
                entries: entries.iter().map(to_pb_entry).collect(),
                leader_commit: leader_commit.get(),
            })
        }
        _ => Err(ServerSide),
    }
}

struct ServerSide;

/// A `tonic`-backed [`RaftTransport`]: one connected channel per peer,
/// dialed lazily on construction and reused for every RPC.
pub struct GrpcRaftTransport {
    clients: HashMap<NodeId, RaftRpcClient<Channel>>,
}

impl GrpcRaftTransport {
    /// `endpoints` maps each peer's [`NodeId`] to the address its gRPC
    /// server listens on (e.g. `http://10.0.0.2:7878`).
    pub async fn connect(endpoints: HashMap<NodeId, String>) -> RaftResult<Self> {
        let mut clients = HashMap::with_capacity(endpoints.len());
        for (node_id, endpoint) in endpoints {
            let channel = Channel::from_shared(endpoint)
                .map_err(|_| RaftError::NotLeader { leader_hint: None })?
                .connect()
                .await
                .map_err(|_| RaftError::NotLeader { leader_hint: None })?;
            clients.insert(node_id, RaftRpcClient::new(channel));
        }
        Ok(Self { clients })
    }

    fn client(&self, peer: NodeId) -> RaftResult<RaftRpcClient<Channel>> {
        self.clients.get(&peer).cloned().ok_or(RaftError::NotLeader { leader_hint: None })
    }
}

impl RaftTransport for GrpcRaftTransport {
    fn send_request_vote(&self, peer: NodeId, request: RaftMessage) -> TransportFuture<'_> {
        let client = self.client(peer);
        Box::pin(async move {
            let mut client = client?;
            let RaftMessage::RequestVote { term, candidate, last_log_index, last_log_term } = request else {
                return Err(RaftError::NotLeader { leader_hint: None });
            };
            let wire = pb::RequestVoteRequest {
                term: term.get(),
                candidate: candidate.get(),
                last_log_index: last_log_index.get(),
                last_log_term: last_log_term.get(),
            };
            let response = client
                .request_vote(Request::new(wire))
                .await
                .map_err(|_| RaftError::NotLeader { leader_hint: None })?
                .into_inner();
            Ok(RaftMessage::RequestVoteResponse { term: Term::new(response.term), granted: response.granted })
        })
    }

    fn send_append_entries(&self, peer: NodeId, request: RaftMessage) -> TransportFuture<'_> {
        let client = self.client(peer);
        Box::pin(async move {
            let mut client = client?;
            let wire = to_pb_message(&request).map_err(|_| RaftError::NotLeader { leader_hint: None })?;
            let response = client
                .append_entries(Request::new(wire))
                .await
                .map_err(|_| RaftError::NotLeader { leader_hint: None })?
                .into_inner();
            Ok(RaftMessage::AppendEntriesResponse {
                term: Term::new(response.term),
                success: response.success,
                last_log_index: LogIndex::new(response.last_log_index),
                conflict_index: response.conflict_index.map(LogIndex::new),
            })
        })
    }
}


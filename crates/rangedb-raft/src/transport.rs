use std::future::Future;
use std::pin::Pin;

use rangedb_core::NodeId;

use crate::error::RaftResult;
use crate::message::RaftMessage;

/// A boxed, already-spawned-or-not future — kept explicit (no `async fn` in
/// the trait) so `RaftTransport` stays object-safe and callers can hold
/// `Arc<dyn RaftTransport>` without an extra proc-macro dependency.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = RaftResult<RaftMessage>> + Send + 'a>>;

/// How a [`crate::node::RaftNode`] reaches its peers. `rangedb-server`
/// supplies the real implementations — a `tonic`-backed one for production
/// and an in-process one for tests — so this crate stays free of any
/// concrete networking dependency.
pub trait RaftTransport: Send + Sync {
    fn send_request_vote(&self, peer: NodeId, request: RaftMessage) -> TransportFuture<'_>;
    fn send_append_entries(&self, peer: NodeId, request: RaftMessage) -> TransportFuture<'_>;
}

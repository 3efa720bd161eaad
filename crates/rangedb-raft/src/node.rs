use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rand::Rng;
use rangedb_core::{LogIndex, NodeId, Term};

use crate::error::{RaftError, RaftResult};
use crate::log::LogEntry;
use crate::message::RaftMessage;

#[derive(Debug, Clone)]
pub struct RaftConfig {
    pub node_id: NodeId,
    pub peers: Vec<NodeId>,
    pub election_timeout_min_ms: u64,
    pub election_timeout_max_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub max_log_entries_per_request: usize,
}

impl Default for RaftConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::new(0),
            peers: Vec::new(),
            election_timeout_min_ms: 150,
            election_timeout_max_ms: 300,
            heartbeat_interval_ms: 50,
            max_log_entries_per_request: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaftState {
    Follower,
    Candidate,
    Leader,
}

/// A single Raft consensus participant. Holds no I/O of its own: callers
/// drive timers and transport, and feed RPCs in through the `handle_*`
/// methods (§4.E).
pub struct RaftNode {
    config: RaftConfig,
    state: RaftState,
    current_term: Term,
    voted_for: Option<NodeId>,
    log: Vec<LogEntry>,
    commit_index: LogIndex,
    last_applied: LogIndex,
    next_index: HashMap<NodeId, LogIndex>,
    match_index: HashMap<NodeId, LogIndex>,
    votes_received: HashSet<NodeId>,
    leader_hint: Option<NodeId>,
}

impl RaftNode {
    pub fn new(config: RaftConfig) -> Self {
        Self {
            config,
            state: RaftState::Follower,
            current_term: Term::ZERO,
            voted_for: None,
            log: Vec::new(),
            commit_index: LogIndex::NONE,
            last_applied: LogIndex::NONE,
            next_index: HashMap::new(),
            match_index: HashMap::new(),
            votes_received: HashSet::new(),
            leader_hint: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.config.node_id
    }

    pub fn state(&self) -> RaftState {
        self.state
    }

    pub fn current_term(&self) -> Term {
        self.current_term
    }

    pub fn voted_for(&self) -> Option<NodeId> {
        self.voted_for
    }

    pub fn commit_index(&self) -> LogIndex {
        self.commit_index
    }

    pub fn last_applied(&self) -> LogIndex {
        self.last_applied
    }

    pub fn leader_hint(&self) -> Option<NodeId> {
        self.leader_hint
    }

    pub fn log_entry(&self, index: LogIndex) -> Option<&LogEntry> {
        if index == LogIndex::NONE {
            return None;
        }
        self.log.get((index.get() - 1) as usize)
    }

    pub fn log_entries_from(&self, index: LogIndex) -> &[LogEntry] {
        if index == LogIndex::NONE {
            return &self.log;
        }
        let slot = (index.get() - 1) as usize;
        if slot >= self.log.len() {
            &[]
        } else {
            &self.log[slot..]
        }
    }

    pub fn last_log_index(&self) -> LogIndex {
        self.log.last().map(|e| e.index).unwrap_or(LogIndex::NONE)
    }

    pub fn last_log_term(&self) -> Term {
        self.log.last().map(|e| e.term).unwrap_or(Term::ZERO)
    }

    /// Re-sampled every time the election timer is reset (§4.E: on a valid
    /// `AppendEntries`, on granting a vote, or on becoming leader).
    pub fn randomized_election_timeout(&self) -> Duration {
        let mut rng = rand::thread_rng();
        let ms = if self.config.election_timeout_max_ms > self.config.election_timeout_min_ms {
            rng.gen_range(self.config.election_timeout_min_ms..=self.config.election_timeout_max_ms)
        } else {
            self.config.election_timeout_min_ms
        };
        Duration::from_millis(ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.config.heartbeat_interval_ms)
    }

    fn majority(&self) -> usize {
        (self.config.peers.len() + 1) / 2 + 1
    }

    fn term_at(&self, index: LogIndex) -> Term {
        self.term_at_checked(index).unwrap_or(Term::ZERO)
    }

    fn term_at_checked(&self, index: LogIndex) -> Option<Term> {
        if index == LogIndex::NONE {
            return Some(Term::ZERO);
        }
        self.log_entry(index).map(|e| e.term)
    }

    fn first_index_of_term(&self, term: Term) -> LogIndex {
        self.log
            .iter()
            .find(|e| e.term == term)
            .map(|e| e.index)
            .unwrap_or_else(|| LogIndex::NONE.next())
    }

    fn step_down(&mut self, term: Term) {
        self.current_term = term;
        self.state = RaftState::Follower;
        self.voted_for = None;
        self.votes_received.clear();
    }

    fn become_leader(&mut self) {
        self.state = RaftState::Leader;
        self.leader_hint = Some(self.config.node_id);
        let next = self.last_log_index().next();
        self.next_index.clear();
        self.match_index.clear();
        for &peer in &self.config.peers {
            self.next_index.insert(peer, next);
            self.match_index.insert(peer, LogIndex::NONE);
        }
    }

    /// Transitions to Candidate, votes for self, and returns the
    /// `RequestVote` to broadcast to every peer.
    pub fn start_election(&mut self) -> RaftMessage {
        self.current_term = self.current_term.next();
        self.state = RaftState::Candidate;
        self.voted_for = Some(self.config.node_id);
        self.leader_hint = None;
        self.votes_received.clear();
        self.votes_received.insert(self.config.node_id);
        RaftMessage::RequestVote {
            term: self.current_term,
            candidate: self.config.node_id,
            last_log_index: self.last_log_index(),
            last_log_term: self.last_log_term(),
        }
    }

    fn is_log_up_to_date(&self, last_log_index: LogIndex, last_log_term: Term) -> bool {
        let my_term = self.last_log_term();
        let my_index = self.last_log_index();
        last_log_term > my_term || (last_log_term == my_term && last_log_index >= my_index)
    }

    pub fn handle_request_vote(&mut self, msg: &RaftMessage) -> RaftMessage {
        let RaftMessage::RequestVote { term, candidate, last_log_index, last_log_term } = *msg else {
            unreachable!("handle_request_vote called with non-RequestVote message")
        };

        if term > self.current_term {
            self.step_down(term);
        }

        let granted = term >= self.current_term
            && (self.voted_for.is_none() || self.voted_for == Some(candidate))
            && self.is_log_up_to_date(last_log_index, last_log_term);

        if granted {
            self.voted_for = Some(candidate);
            self.current_term = term;
        }

        RaftMessage::RequestVoteResponse { term: self.current_term, granted }
    }

    /// Returns the heartbeat `AppendEntries` to send each peer, if this vote
    /// just won the election.
    pub fn handle_vote_response(
        &mut self,
        from: NodeId,
        msg: &RaftMessage,
    ) -> Option<Vec<(NodeId, RaftMessage)>> {
        let RaftMessage::RequestVoteResponse { term, granted } = *msg else {
            unreachable!("handle_vote_response called with non-RequestVoteResponse message")
        };

        if term > self.current_term {
            self.step_down(term);
            return None;
        }
        if self.state != RaftState::Candidate || term != self.current_term || !granted {
            return None;
        }

        self.votes_received.insert(from);
        if self.votes_received.len() >= self.majority() {
            self.become_leader();
            return Some(
                self.config
                    .peers
                    .iter()
                    .map(|&peer| (peer, self.build_append_entries(peer)))
                    .collect(),
            );
        }
        None
    }

    /// Appends `command` to the leader's log and returns the `AppendEntries`
    /// to replicate it with, one per peer. Errors if this node isn't leader.
    pub fn propose(&mut self, command: Vec<u8>) -> RaftResult<Vec<(NodeId, RaftMessage)>> {
        if self.state != RaftState::Leader {
            return Err(RaftError::NotLeader { leader_hint: self.leader_hint });
        }
        let entry = LogEntry {
            index: self.last_log_index().next(),
            term: self.current_term,
            command,
        };
        self.log.push(entry);
        Ok(self
            .config
            .peers
            .iter()
            .map(|&peer| (peer, self.build_append_entries(peer)))
            .collect())
    }

    pub fn build_append_entries(&self, peer: NodeId) -> RaftMessage {
        let next = self
            .next_index
            .get(&peer)
            .copied()
            .unwrap_or_else(|| LogIndex::NONE.next());
        let prev_log_index = next.prev();
        let prev_log_term = self.term_at(prev_log_index);
        let entries = self
            .log_entries_from(next)
            .iter()
            .take(self.config.max_log_entries_per_request)
            .cloned()
            .collect();
        RaftMessage::AppendEntries {
            term: self.current_term,
            leader: self.config.node_id,
            prev_log_index,
            prev_log_term,
            entries,
            leader_commit: self.commit_index,
        }
    }

    pub fn handle_append_entries(&mut self, msg: &RaftMessage) -> RaftMessage {
        let RaftMessage::AppendEntries {
            term,
            leader,
            prev_log_index,
            prev_log_term,
            ref entries,
            leader_commit,
        } = *msg
        else {
            unreachable!("handle_append_entries called with non-AppendEntries message")
        };

        if term < self.current_term {
            return RaftMessage::AppendEntriesResponse {
                term: self.current_term,
                success: false,
                last_log_index: self.last_log_index(),
                conflict_index: None,
            };
        }

        if term > self.current_term || self.state != RaftState::Follower {
            self.step_down(term);
        }
        self.current_term = term;
        self.leader_hint = Some(leader);

        if prev_log_index != LogIndex::NONE {
            match self.term_at_checked(prev_log_index) {
                None => {
                    return RaftMessage::AppendEntriesResponse {
                        term: self.current_term,
                        success: false,
                        last_log_index: self.last_log_index(),
                        conflict_index: Some(self.last_log_index().next()),
                    };
                }
                Some(existing_term) if existing_term != prev_log_term => {
                    let conflict_index = self.first_index_of_term(existing_term);
                    self.log.truncate((prev_log_index.get() as usize).saturating_sub(1));
                    return RaftMessage::AppendEntriesResponse {
                        term: self.current_term,
                        success: false,
                        last_log_index: self.last_log_index(),
                        conflict_index: Some(conflict_index),
                    };
                }
                _ => {}
            }
        }

        for entry in entries {
            let slot = (entry.index.get() - 1) as usize;
            let already_present = matches!(self.log.get(slot), Some(existing) if existing.term == entry.term);
            if !already_present {
                self.log.truncate(slot);
                self.log.push(entry.clone());
            }
        }

        if leader_commit > self.commit_index {
            self.commit_index = leader_commit.min(self.last_log_index());
        }

        RaftMessage::AppendEntriesResponse {
            term: self.current_term,
            success: true,
            last_log_index: self.last_log_index(),
            conflict_index: None,
        }
    }

    /// Updates replication progress for `from` and, on success, advances
    /// `commit_index` if a majority now holds the new entries. Returns the
    /// entries newly committed by this response (not yet applied).
    pub fn handle_append_response(&mut self, from: NodeId, msg: &RaftMessage) -> Vec<LogEntry> {
        let RaftMessage::AppendEntriesResponse { term, success, last_log_index, conflict_index } = *msg else {
            unreachable!("handle_append_response called with non-AppendEntriesResponse message")
        };

        if term > self.current_term {
            self.step_down(term);
            return Vec::new();
        }
        if self.state != RaftState::Leader || term != self.current_term {
            return Vec::new();
        }

        if success {
            self.match_index.insert(from, last_log_index);
            self.next_index.insert(from, last_log_index.next());
            self.try_advance_commit()
        } else {
            let fallback = self
                .next_index
                .get(&from)
                .copied()
                .unwrap_or_else(|| LogIndex::NONE.next())
                .prev();
            let retreat = conflict_index.unwrap_or(fallback);
            let retreat = if retreat == LogIndex::NONE { LogIndex::NONE.next() } else { retreat };
            self.next_index.insert(from, retreat);
            Vec::new()
        }
    }

    fn try_advance_commit(&mut self) -> Vec<LogEntry> {
        let mut indices: Vec<LogIndex> = self.match_index.values().copied().collect();
        indices.push(self.last_log_index());
        indices.sort_unstable();

        let majority = self.majority();
        if indices.len() < majority {
            return Vec::new();
        }
        let candidate = indices[indices.len() - majority];

        if candidate > self.commit_index && self.term_at(candidate) == self.current_term {
            let previous_commit = self.commit_index;
            self.commit_index = candidate;
            return self
                .log_entries_from(previous_commit.next())
                .iter()
                .take_while(|e| e.index <= candidate)
                .cloned()
                .collect();
        }
        Vec::new()
    }

    /// Drains entries between `last_applied` and `commit_index`, advancing
    /// `last_applied` to match. Callers feed the result to their
    /// [`crate::state_machine::StateMachine`] in order.
    pub fn take_committed_entries(&mut self) -> Vec<LogEntry> {
        if self.last_applied >= self.commit_index {
            return Vec::new();
        }
        let entries: Vec<LogEntry> = self
            .log_entries_from(self.last_applied.next())
            .iter()
            .take_while(|e| e.index <= self.commit_index)
            .cloned()
            .collect();
        if let Some(last) = entries.last() {
            self.last_applied = last.index;
        }
        entries
    }

    /// `InstallSnapshot` is reserved by §4.E and intentionally unimplemented.
    pub fn handle_install_snapshot(&mut self, _msg: &RaftMessage) -> RaftResult<RaftMessage> {
        Err(RaftError::SnapshotNotImplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, peers: &[u64]) -> RaftNode {
        RaftNode::new(RaftConfig {
            node_id: NodeId::new(id),
            peers: peers.iter().map(|&p| NodeId::new(p)).collect(),
            ..RaftConfig::default()
        })
    }

    #[test]
    fn starts_as_follower_with_term_zero() {
        let n = node(1, &[2, 3]);
        assert_eq!(n.state(), RaftState::Follower);
        assert_eq!(n.current_term(), Term::ZERO);
        assert!(n.voted_for().is_none());
    }

    #[test]
    fn election_wins_with_majority_and_becomes_leader() {
        let mut candidate = node(1, &[2, 3]);
        let vote_req = candidate.start_election();
        assert_eq!(candidate.state(), RaftState::Candidate);

        let mut follower2 = node(2, &[1, 3]);
        let resp2 = follower2.handle_request_vote(&vote_req);
        let RaftMessage::RequestVoteResponse { granted, .. } = resp2 else { panic!() };
        assert!(granted);

        assert!(candidate.handle_vote_response(NodeId::new(2), &resp2).is_none());

        let mut follower3 = node(3, &[1, 2]);
        let resp3 = follower3.handle_request_vote(&vote_req);
        let heartbeats = candidate.handle_vote_response(NodeId::new(3), &resp3);
        assert!(heartbeats.is_some());
        assert_eq!(candidate.state(), RaftState::Leader);
    }

    #[test]
    fn stale_term_request_vote_is_rejected() {
        let mut follower = node(1, &[2, 3]);
        follower.start_election(); // bumps term to 1, but as candidate for itself
        let follower_term = follower.current_term();
        let stale = RaftMessage::RequestVote {
            term: Term::ZERO,
            candidate: NodeId::new(2),
            last_log_index: LogIndex::NONE,
            last_log_term: Term::ZERO,
        };
        let resp = follower.handle_request_vote(&stale);
        let RaftMessage::RequestVoteResponse { granted, term } = resp else { panic!() };
        assert!(!granted);
        assert_eq!(term, follower_term);
    }

    #[test]
    fn propose_fails_when_not_leader() {
        let mut follower = node(1, &[2, 3]);
        let err = follower.propose(b"hello".to_vec()).unwrap_err();
        assert!(matches!(err, RaftError::NotLeader { .. }));
    }

    #[test]
    fn leader_replicates_and_advances_commit_on_majority() {
        let mut leader = elect_three_node_leader();
        let mut f2 = node(2, &[1, 3]);
        let mut f3 = node(3, &[1, 2]);

        let sends = leader.propose(b"op1".to_vec()).unwrap();
        assert_eq!(leader.commit_index(), LogIndex::NONE);

        // In a 3-node cluster the leader's own log counts as one vote, so
        // replication to a single follower already forms a majority.
        let (first_peer, first_msg) = sends.into_iter().next().unwrap();
        let first_resp = if first_peer == NodeId::new(2) {
            f2.handle_append_entries(&first_msg)
        } else {
            f3.handle_append_entries(&first_msg)
        };
        let committed = leader.handle_append_response(first_peer, &first_resp);
        assert_eq!(committed.len(), 1);

        assert_eq!(leader.commit_index(), LogIndex::new(1));
        let applied = leader.take_committed_entries();
        assert_eq!(applied.len(), 1);
        assert_eq!(leader.last_applied(), LogIndex::new(1));
    }

    #[test]
    fn append_entries_rejects_on_log_consistency_mismatch() {
        let mut follower = node(2, &[1, 3]);
        let msg = RaftMessage::AppendEntries {
            term: Term::new(1),
            leader: NodeId::new(1),
            prev_log_index: LogIndex::new(5),
            prev_log_term: Term::new(1),
            entries: Vec::new(),
            leader_commit: LogIndex::NONE,
        };
        let resp = follower.handle_append_entries(&msg);
        let RaftMessage::AppendEntriesResponse { success, conflict_index, .. } = resp else { panic!() };
        assert!(!success);
        assert!(conflict_index.is_some());
    }

    #[test]
    fn higher_term_append_entries_steps_down_candidate() {
        let mut candidate = node(1, &[2, 3]);
        candidate.start_election();
        assert_eq!(candidate.state(), RaftState::Candidate);

        let msg = RaftMessage::AppendEntries {
            term: Term::new(5),
            leader: NodeId::new(2),
            prev_log_index: LogIndex::NONE,
            prev_log_term: Term::ZERO,
            entries: Vec::new(),
            leader_commit: LogIndex::NONE,
        };
        let resp = candidate.handle_append_entries(&msg);
        let RaftMessage::AppendEntriesResponse { success, .. } = resp else { panic!() };
        assert!(success);
        assert_eq!(candidate.state(), RaftState::Follower);
        assert_eq!(candidate.current_term(), Term::new(5));
        assert_eq!(candidate.leader_hint(), Some(NodeId::new(2)));
    }

    #[test]
    fn bounded_batch_respects_max_log_entries_per_request() {
        let mut leader = elect_three_node_leader_with_config(RaftConfig {
            max_log_entries_per_request: 2,
            ..RaftConfig::default()
        });
        for i in 0..5 {
            leader.propose(format!("op{i}").into_bytes()).unwrap();
        }
        let msg = leader.build_append_entries(NodeId::new(2));
        let RaftMessage::AppendEntries { entries, .. } = msg else { panic!() };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn install_snapshot_is_unimplemented() {
        let mut follower = node(2, &[1, 3]);
        let msg = RaftMessage::InstallSnapshot {
            term: Term::ZERO,
            leader: NodeId::new(1),
            last_included_index: LogIndex::NONE,
            last_included_term: Term::ZERO,
        };
        assert!(matches!(
            follower.handle_install_snapshot(&msg),
            Err(RaftError::SnapshotNotImplemented)
        ));
    }

    fn elect_three_node_leader() -> RaftNode {
        elect_three_node_leader_with_config(RaftConfig::default())
    }

    fn elect_three_node_leader_with_config(mut base: RaftConfig) -> RaftNode {
        base.node_id = NodeId::new(1);
        base.peers = vec![NodeId::new(2), NodeId::new(3)];
        let mut leader = RaftNode::new(base);
        let vote_req = leader.start_election();

        let mut f2 = node(2, &[1, 3]);
        let resp2 = f2.handle_request_vote(&vote_req);
        leader.handle_vote_response(NodeId::new(2), &resp2);

        let mut f3 = node(3, &[1, 2]);
        let resp3 = f3.handle_request_vote(&vote_req);
        leader.handle_vote_response(NodeId::new(3), &resp3);

        assert_eq!(leader.state(), RaftState::Leader);
        leader
    }
}

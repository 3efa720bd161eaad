use std::collections::{HashMap, HashSet, VecDeque};

use rangedb_hlc::HlcTimestamp;

use crate::glob::glob_match;
use crate::message::Message;

pub type SubscriberId = u64;

struct ChannelState {
    last_published_ms: u64,
}

/// Tracks exact and glob-pattern subscriptions and delivers publishes to
/// both identically (§4.J). Channels come into existence on first publish
/// and are reaped after sitting idle past a caller-supplied threshold;
/// subscriptions themselves are independent of channel existence, so a
/// pattern subscription matches a channel the moment it is (re)created.
#[derive(Default)]
pub struct SubscriptionRegistry {
    channels: HashMap<String, ChannelState>,
    exact: HashMap<String, HashSet<SubscriberId>>,
    patterns: HashMap<String, HashSet<SubscriberId>>,
    pending: HashMap<SubscriberId, VecDeque<Message>>,
    max_pending_per_subscriber: usize,
}

impl SubscriptionRegistry {
    pub fn new(max_pending_per_subscriber: usize) -> Self {
        Self {
            channels: HashMap::new(),
            exact: HashMap::new(),
            patterns: HashMap::new(),
            pending: HashMap::new(),
            max_pending_per_subscriber,
        }
    }

    pub fn subscribe_exact(&mut self, channel: impl Into<String>, subscriber: SubscriberId) {
        self.exact.entry(channel.into()).or_default().insert(subscriber);
        self.pending.entry(subscriber).or_default();
    }

    pub fn subscribe_pattern(&mut self, pattern: impl Into<String>, subscriber: SubscriberId) {
        self.patterns.entry(pattern.into()).or_default().insert(subscriber);
        self.pending.entry(subscriber).or_default();
    }

    pub fn unsubscribe_all(&mut self, subscriber: SubscriberId) {
        for subs in self.exact.values_mut() {
            subs.remove(&subscriber);
        }
        for subs in self.patterns.values_mut() {
            subs.remove(&subscriber);
        }
        self.pending.remove(&subscriber);
    }

    /// Delivers `data` on `channel`, creating the channel on first publish.
    /// `id` should be the committed Raft log index of the `PUBLISH` command
    /// so replays of the same entry never double-deliver.
    pub fn publish(
        &mut self,
        channel: &str,
        data: Vec<u8>,
        ts: HlcTimestamp,
        id: u64,
        now_ms: u64,
    ) -> Message {
        self.channels
            .entry(channel.to_string())
            .and_modify(|c| c.last_published_ms = now_ms)
            .or_insert(ChannelState { last_published_ms: now_ms });

        let message = Message { channel: channel.to_string(), data, ts, id };

        let mut targets: HashSet<SubscriberId> =
            self.exact.get(channel).cloned().unwrap_or_default();
        for (pattern, subs) in &self.patterns {
            if glob_match(pattern, channel) {
                targets.extend(subs.iter().copied());
            }
        }

        for subscriber in targets {
            let queue = self.pending.entry(subscriber).or_default();
            if queue.len() >= self.max_pending_per_subscriber {
                queue.pop_front();
            }
            queue.push_back(message.clone());
        }

        message
    }

    pub fn drain_pending(&mut self, subscriber: SubscriberId) -> Vec<Message> {
        self.pending.get_mut(&subscriber).map(|q| q.drain(..).collect()).unwrap_or_default()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Drops channel bookkeeping for channels idle past `idle_threshold_ms`.
    /// Subscriptions on a reaped channel are left intact — the next publish
    /// simply recreates it.
    pub fn reap_idle_channels(&mut self, now_ms: u64, idle_threshold_ms: u64) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, state| now_ms.saturating_sub(state.last_published_ms) < idle_threshold_ms);
        before - self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> HlcTimestamp {
        HlcTimestamp::new(1, 0)
    }

    #[test]
    fn exact_subscriber_receives_published_message() {
        let mut registry = SubscriptionRegistry::new(10);
        registry.subscribe_exact("orders", 1);
        registry.publish("orders", b"hi".to_vec(), ts(), 1, 0);
        let received = registry.drain_pending(1);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].data, b"hi");
    }

    #[test]
    fn pattern_subscriber_matches_like_exact_subscriber() {
        let mut registry = SubscriptionRegistry::new(10);
        registry.subscribe_pattern("orders.*", 2);
        registry.publish("orders.created", b"x".to_vec(), ts(), 1, 0);
        assert_eq!(registry.drain_pending(2).len(), 1);
    }

    #[test]
    fn channel_is_created_on_first_publish() {
        let mut registry = SubscriptionRegistry::new(10);
        assert_eq!(registry.channel_count(), 0);
        registry.publish("new-channel", vec![], ts(), 1, 0);
        assert_eq!(registry.channel_count(), 1);
    }

    #[test]
    fn idle_channels_are_reaped() {
        let mut registry = SubscriptionRegistry::new(10);
        registry.publish("stale", vec![], ts(), 1, 0);
        let reaped = registry.reap_idle_channels(10_000, 5_000);
        assert_eq!(reaped, 1);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let mut registry = SubscriptionRegistry::new(10);
        registry.subscribe_exact("orders", 1);
        registry.unsubscribe_all(1);
        registry.publish("orders", vec![], ts(), 1, 0);
        assert!(registry.drain_pending(1).is_empty());
    }

    #[test]
    fn overflow_drops_oldest_pending_message() {
        let mut registry = SubscriptionRegistry::new(2);
        registry.subscribe_exact("c", 1);
        registry.publish("c", b"1".to_vec(), ts(), 1, 0);
        registry.publish("c", b"2".to_vec(), ts(), 2, 0);
        registry.publish("c", b"3".to_vec(), ts(), 3, 0);
        let received = registry.drain_pending(1);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].data, b"2");
        assert_eq!(received[1].data, b"3");
    }
}

use std::future::Future;
use std::time::Duration;

use rand::seq::SliceRandom;
use rangedb_core::{Hint, Key, NodeId, Timestamp, Value};
use rangedb_hlc::HlcTimestamp;

use crate::error::ConsistencyError;
use crate::handoff::HintedHandoff;
use crate::level::{required_responses, ConsistencyLevel, DatacenterReplicas};

/// Outcome of [`coordinate_read`] (§4.H's literal return shape).
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub success: bool,
    pub value: Option<Value>,
    pub satisfied: usize,
    pub required: usize,
    pub responses: usize,
    pub repair_performed: bool,
}

/// Outcome of [`coordinate_write`].
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub success: bool,
    pub satisfied: usize,
    pub required: usize,
    pub responses: usize,
    pub hints_stored: usize,
}

async fn gather<Fut, T>(
    replicas: &[NodeId],
    required: usize,
    timeout: Duration,
    dispatch: impl Fn(NodeId) -> Fut,
) -> Vec<(NodeId, Result<T, String>)>
where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
    T: Send + 'static,
{
    let mut set = tokio::task::JoinSet::new();
    for &node in replicas {
        let fut = dispatch(node);
        set.spawn(async move { (node, fut.await) });
    }

    let deadline = tokio::time::Instant::now() + timeout;
    let mut responses = Vec::new();
    loop {
        let successes = responses.iter().filter(|(_, r): &(NodeId, Result<T, String>)| r.is_ok()).count();
        if successes >= required {
            break;
        }
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, set.join_next()).await {
            Ok(Some(Ok(item))) => responses.push(item),
            Ok(Some(Err(_join_error))) => continue,
            Ok(None) => break,
            Err(_elapsed) => break,
        }
    }
    responses
}

/// Scatters a read to `replicas` in parallel via `dispatch`, waits for
/// `level`'s required number of successful responses (or `timeout`), and
/// returns the value with the highest HLC timestamp. When `read_repair` is
/// set and at least two replicas answered, stale replicas are asynchronously
/// overwritten with the winning value through `repair` (§4.H).
#[allow(clippy::too_many_arguments)]
pub async fn coordinate_read<ReadFut, RepairFut>(
    replicas: &[NodeId],
    level: ConsistencyLevel,
    dcs: &DatacenterReplicas,
    timeout: Duration,
    read_repair: bool,
    dispatch: impl Fn(NodeId) -> ReadFut,
    repair: impl Fn(NodeId, Value) -> RepairFut + Send + Clone + 'static,
) -> Result<ReadOutcome, ConsistencyError>
where
    ReadFut: Future<Output = Result<(Value, HlcTimestamp), String>> + Send + 'static,
    RepairFut: Future<Output = Result<(), String>> + Send + 'static,
{
    if replicas.is_empty() {
        return Err(ConsistencyError::NoReplicas);
    }
    let required = required_responses(level, replicas.len(), dcs)?;

    let responses = gather(replicas, required, timeout, dispatch).await;
    let successes: Vec<(NodeId, Value, HlcTimestamp)> = responses
        .into_iter()
        .filter_map(|(node, r)| r.ok().map(|(v, ts)| (node, v, ts)))
        .collect();

    let satisfied = successes.len();
    let winner = successes.iter().max_by_key(|(_, _, ts)| *ts).map(|(_, v, ts)| (v.clone(), *ts));

    let mut repair_performed = false;
    if read_repair && satisfied >= 2 {
        if let Some((winning_value, winning_ts)) = &winner {
            let stale: Vec<NodeId> =
                successes.iter().filter(|(_, _, ts)| ts < winning_ts).map(|(n, _, _)| *n).collect();
            if !stale.is_empty() {
                repair_performed = true;
                for node in stale {
                    let value = winning_value.clone();
                    let repair = repair.clone();
                    tokio::spawn(async move {
                        if let Err(e) = repair(node, value).await {
                            tracing::warn!(%node, error = %e, "read repair failed");
                        }
                    });
                }
            }
        }
    }

    Ok(ReadOutcome {
        success: satisfied >= required,
        value: winner.map(|(v, _)| v),
        satisfied,
        required,
        responses: satisfied,
        repair_performed,
    })
}

/// Scatters a write to `replicas` in parallel via `dispatch`. If the
/// required number of replicas still succeed but some failed, and
/// `hinted_handoff` is enabled, stores a [`Hint`] on a random healthy
/// replica for each failed peer (§4.H).
pub async fn coordinate_write<WriteFut>(
    replicas: &[NodeId],
    level: ConsistencyLevel,
    dcs: &DatacenterReplicas,
    timeout: Duration,
    key: &Key,
    value: &Value,
    hinted_handoff: Option<(&HintedHandoff, u64)>,
    dispatch: impl Fn(NodeId) -> WriteFut,
) -> Result<WriteOutcome, ConsistencyError>
where
    WriteFut: Future<Output = Result<(), String>> + Send + 'static,
{
    if replicas.is_empty() {
        return Err(ConsistencyError::NoReplicas);
    }
    let required = required_responses(level, replicas.len(), dcs)?;

    let mut set = tokio::task::JoinSet::new();
    for &node in replicas {
        let fut = dispatch(node);
        set.spawn(async move { (node, fut.await) });
    }
    let mut responses = Vec::with_capacity(replicas.len());
    while let Some(joined) = set.join_next().await {
        if let Ok(item) = joined {
            responses.push(item);
        }
    }

    let succeeded: Vec<NodeId> = responses.iter().filter(|(_, r)| r.is_ok()).map(|(n, _)| *n).collect();
    let failed: Vec<NodeId> = responses.iter().filter(|(_, r)| r.is_err()).map(|(n, _)| *n).collect();
    let satisfied = succeeded.len();

    let mut hints_stored = 0;
    if satisfied >= required && !failed.is_empty() {
        if let Some((handoff, ttl_secs)) = hinted_handoff {
            let mut rng = rand::thread_rng();
            for &failed_node in &failed {
                if let Some(&healthy_target) = succeeded.choose(&mut rng) {
                    handoff.store(Hint {
                        failed_node,
                        target_node: healthy_target,
                        key: key.clone(),
                        value_bytes: value.bytes.clone(),
                        hlc_physical_ms: value.hlc_physical_ms,
                        hlc_logical: value.hlc_logical,
                        created_ts: Timestamp::now(),
                        ttl_secs,
                    });
                    hints_stored += 1;
                }
            }
        }
    }

    Ok(WriteOutcome { success: satisfied >= required, satisfied, required, responses: responses.len(), hints_stored })
}

use std::collections::HashMap;

use rangedb_core::ShardId;
use serde::{Deserialize, Serialize};

/// §4.G's enumerated placement strategies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStrategy {
    RoundRobin,
    NumaAware,
    LoadBalanced,
    LocalityAware,
    CapacityBased,
}

/// One detected NUMA node and the cores attached to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NumaNode {
    pub node_id: u32,
    pub core_ids: Vec<u32>,
    /// 0.0-1.0 utilization snapshot taken at startup, used by `LoadBalanced`.
    pub cpu_utilization: f64,
    /// Bytes of NVMe/storage capacity attached to this NUMA node, used by
    /// `CapacityBased`.
    pub capacity_bytes: u64,
}

/// Detected machine topology: the NUMA nodes and their cores. Grounded on
/// the teacher's site/rack enumeration shape, narrowed to a single node's
/// NUMA layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NumaTopology {
    pub nodes: Vec<NumaNode>,
}

impl NumaTopology {
    pub fn single_node(core_count: u32) -> Self {
        Self {
            nodes: vec![NumaNode {
                node_id: 0,
                core_ids: (0..core_count).collect(),
                cpu_utilization: 0.0,
                capacity_bytes: 0,
            }],
        }
    }

    pub fn total_cores(&self) -> u32 {
        self.nodes.iter().map(|n| n.core_ids.len() as u32).sum()
    }
}

/// Assigns `num_shards` shards to NUMA nodes per the chosen strategy (§4.G).
/// The assignment is a pure function of the topology; placement of shard
/// workers onto OS threads happens one layer up in [`crate::worker`].
pub struct ShardPlacer;

impl ShardPlacer {
    pub fn assign(
        num_shards: u16,
        topology: &NumaTopology,
        strategy: PlacementStrategy,
    ) -> HashMap<ShardId, u32> {
        if topology.nodes.is_empty() {
            return HashMap::new();
        }

        match strategy {
            PlacementStrategy::RoundRobin => Self::round_robin(num_shards, topology),
            PlacementStrategy::NumaAware => Self::numa_aware(num_shards, topology),
            PlacementStrategy::LoadBalanced => Self::load_balanced(num_shards, topology),
            PlacementStrategy::LocalityAware => Self::locality_aware(num_shards, topology),
            PlacementStrategy::CapacityBased => Self::capacity_based(num_shards, topology),
        }
    }

    fn round_robin(num_shards: u16, topology: &NumaTopology) -> HashMap<ShardId, u32> {
        let mut out = HashMap::new();
        for i in 0..num_shards {
            let node = &topology.nodes[i as usize % topology.nodes.len()];
            out.insert(ShardId::new(i as u32), node.node_id);
        }
        out
    }

    /// Distributes shards proportionally to each node's core count.
    fn numa_aware(num_shards: u16, topology: &NumaTopology) -> HashMap<ShardId, u32> {
        let total_cores = topology.total_cores().max(1);
        let mut out = HashMap::new();
        let mut shard_idx = 0u16;
        for node in &topology.nodes {
            let share = ((node.core_ids.len() as u64 * num_shards as u64) / total_cores as u64) as u16;
            for _ in 0..share {
                if shard_idx >= num_shards {
                    break;
                }
                out.insert(ShardId::new(shard_idx as u32), node.node_id);
                shard_idx += 1;
            }
        }
        // Leftovers from integer rounding go to the least-loaded node.
        while shard_idx < num_shards {
            let least = topology
                .nodes
                .iter()
                .min_by(|a, b| a.cpu_utilization.partial_cmp(&b.cpu_utilization).unwrap())
                .unwrap();
            out.insert(ShardId::new(shard_idx as u32), least.node_id);
            shard_idx += 1;
        }
        out
    }

    /// Sorts nodes by ascending utilization and fills the least-loaded first.
    fn load_balanced(num_shards: u16, topology: &NumaTopology) -> HashMap<ShardId, u32> {
        let mut nodes: Vec<&NumaNode> = topology.nodes.iter().collect();
        nodes.sort_by(|a, b| a.cpu_utilization.partial_cmp(&b.cpu_utilization).unwrap());
        let mut out = HashMap::new();
        for i in 0..num_shards {
            let node = nodes[i as usize % nodes.len()];
            out.insert(ShardId::new(i as u32), node.node_id);
        }
        out
    }

    /// Groups shards by `shard_id % node_count` so related shards (by hash
    /// group) land on the same NUMA node.
    fn locality_aware(num_shards: u16, topology: &NumaTopology) -> HashMap<ShardId, u32> {
        let group_size = (num_shards as usize).div_ceil(topology.nodes.len()).max(1);
        let mut out = HashMap::new();
        for i in 0..num_shards {
            let node = &topology.nodes[(i as usize / group_size) % topology.nodes.len()];
            out.insert(ShardId::new(i as u32), node.node_id);
        }
        out
    }

    /// Distributes shards proportionally to each node's storage capacity.
    fn capacity_based(num_shards: u16, topology: &NumaTopology) -> HashMap<ShardId, u32> {
        let total_capacity: u64 = topology.nodes.iter().map(|n| n.capacity_bytes).sum::<u64>().max(1);
        let mut out = HashMap::new();
        let mut shard_idx = 0u16;
        for node in &topology.nodes {
            let share = ((node.capacity_bytes * num_shards as u64) / total_capacity) as u16;
            for _ in 0..share {
                if shard_idx >= num_shards {
                    break;
                }
                out.insert(ShardId::new(shard_idx as u32), node.node_id);
                shard_idx += 1;
            }
        }
        while shard_idx < num_shards {
            out.insert(ShardId::new(shard_idx as u32), topology.nodes[0].node_id);
            shard_idx += 1;
        }
        out
    }
}

use std::path::PathBuf;

use rangedb_raft::RaftConfig;
use rangedb_shard::{PlacementStrategy, ShardManagerConfig, ShardStoreConfig};
use rangedb_wal::WalConfig;

/// Top-level node configuration. Every field has a sensible default (as in
/// the subsystem configs it wraps); [`ServerConfig::from_env`] overrides
/// fields present in the environment rather than requiring a config file.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub node_id: u64,
    pub listen_addr: String,
    pub data_dir: PathBuf,
    pub raft: RaftConfig,
    pub wal: WalConfig,
    pub shard: ShardManagerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./data");
        Self {
            node_id: 1,
            listen_addr: "127.0.0.1:7878".to_string(),
            raft: RaftConfig::default(),
            wal: WalConfig { dir: data_dir.join("wal"), ..WalConfig::default() },
            shard: ShardManagerConfig {
                placement_strategy: PlacementStrategy::NumaAware,
                store_config: ShardStoreConfig::default(),
                ..ShardManagerConfig::default()
            },
            data_dir,
        }
    }
}

impl ServerConfig {
    /// Overrides defaults from `RANGEDB_*` environment variables. Unset
    /// variables leave the corresponding default untouched; malformed ones
    /// are logged and ignored rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("RANGEDB_NODE_ID") {
            match v.parse() {
                Ok(id) => config.node_id = id,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid RANGEDB_NODE_ID"),
            }
        }
        if let Ok(v) = std::env::var("RANGEDB_LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Ok(v) = std::env::var("RANGEDB_DATA_DIR") {
            config.data_dir = PathBuf::from(&v);
            config.wal.dir = config.data_dir.join("wal");
        }
        if let Ok(v) = std::env::var("RANGEDB_NUM_SHARDS") {
            match v.parse() {
                Ok(n) => config.shard.num_shards = Some(n),
                Err(_) => tracing::warn!(value = %v, "ignoring invalid RANGEDB_NUM_SHARDS"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_wal_dir_under_data_dir() {
        let config = ServerConfig::default();
        assert_eq!(config.wal.dir, config.data_dir.join("wal"));
    }
}

use std::sync::Arc;

use rangedb_server::ServerConfig;
use rangedb_shard::{NumaTopology, ShardManager};
use rangedb_wal::Wal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(node_id = config.node_id, addr = %config.listen_addr, "starting rangedb node");

    let wal = Wal::start(config.wal.clone())?;
    let topology = NumaTopology::single_node(std::thread::available_parallelism()?.get() as u32);
    let shards = Arc::new(ShardManager::new(config.shard.clone(), &topology, Some(wal)));
    tracing::info!(num_shards = shards.num_shards(), "shard manager ready");

    tracing::info!("rangedb node up, listening on {}", config.listen_addr);
    std::future::pending::<()>().await;
    Ok(())
}

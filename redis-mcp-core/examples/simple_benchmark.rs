/*!
Simple benchmark example for hyperfine performance testing.

Backs up a populated in-memory store to a gzip snapshot and restores it into
an empty one.
*/

use redis_mcp_core::store::KeyValueStore;
use redis_mcp_core::{BackupEngine, MemoryStore, PatternSet, RestoreEngine, SortedSetMember};
use std::sync::Arc;
use std::time::Instant;

const KEYS_PER_KIND: usize = 2_000;

#[tokio::main]
async fn main() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let source = Arc::new(MemoryStore::new());

    for i in 0..KEYS_PER_KIND {
        source
            .set(&format!("session:{i}"), &format!("token-{i}"), Some(3600))
            .await
            .unwrap();
        source
            .hset_multiple(
                &format!("user:{i}"),
                &[
                    ("name".to_string(), format!("user {i}")),
                    ("plan".to_string(), "pro".to_string()),
                ],
            )
            .await
            .unwrap();
        source
            .rpush(&format!("queue:{i}"), &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
    }
    let scores: Vec<SortedSetMember> = (0..KEYS_PER_KIND)
        .map(|i| SortedSetMember::new(format!("player:{i}"), i as f64 * 1.5))
        .collect();
    source.zadd("leaderboard", &scores).await.unwrap();

    let file_path = temp_dir.path().join("benchmark_snapshot.json.gz");
    let start = Instant::now();

    let backup = BackupEngine::new(source)
        .backup(&PatternSet::default(), &file_path)
        .await
        .unwrap();

    let target = Arc::new(MemoryStore::new());
    let restore = RestoreEngine::new(target.clone())
        .restore(&file_path, true)
        .await
        .unwrap();

    let duration = start.elapsed();

    assert_eq!(restore.restored, backup.captured);
    assert_eq!(target.len().await, backup.captured);

    println!("Benchmark operation completed in: {:?}", duration);
    println!("Keys captured: {}", backup.captured);
    println!("File size: {} bytes", backup.bytes);
}

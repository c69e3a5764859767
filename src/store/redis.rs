use std::collections::HashSet;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{KeyValueStore, StoreError};

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 256;

/// Store backed by a Redis server.
///
/// The multiplexed connection is cloned per call, so one `RedisStore` can be
/// shared by every in-flight request. Conditional creates use `SETNX`, which
/// Redis applies atomically.
#[derive(Clone)]
pub struct RedisStore {
    con: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let con = client.get_multiplexed_async_connection().await?;
        tracing::info!(url, "Connected to redis store");
        Ok(Self { con })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut con = self.con.clone();
        let value: Option<Vec<u8>> = con.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut con = self.con.clone();
        let _: () = con.set(key, value).await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StoreError> {
        let mut con = self.con.clone();
        let created: bool = con.set_nx(key, value).await?;
        Ok(created)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut con = self.con.clone();
        let pattern = format!("{}*", escape_glob(prefix));

        // SCAN may repeat keys across batches
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut con)
                .await?;

            for key in batch {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<Vec<u8>>> = con.mget(&keys).await?;
        if values.len() != keys.len() {
            return Err(StoreError::Backend(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }

        // Keys deleted between SCAN and MGET come back as nil
        Ok(keys
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }
}

/// Escape Redis glob metacharacters so `prefix` matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

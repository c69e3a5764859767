//! Key-value backends holding the registry's persisted bytes.
//!
//! The registry only needs single-key reads and writes, a conditional
//! create, and a prefix scan. Anything offering those can sit behind
//! [`KeyValueStore`]:
//!
//! - [`MemoryStore`]: in-process map, used by tests and single-node setups
//! - [`RedisStore`]: shared backend reached over a multiplexed connection
//!
//! Implementations must be safe for concurrent use through `&self`; the
//! registry shares one store across all in-flight requests.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored at `key`, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Unconditionally write `value` at `key`.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Atomically write `value` only if `key` is absent. Returns `false`
    /// without writing when the key already holds a value.
    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StoreError>;

    /// All entries whose key starts with `prefix`, in backend order.
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;
}

use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{JobDockError, Result};
use crate::registry::codec::MetadataCodec;
use crate::registry::metadata::{JobList, Metadata};
use crate::store::{KeyValueStore, StoreError};

/// Namespace under which every job's metadata is stored.
pub const METADATA_PREFIX: &str = "metadata/";

pub fn metadata_key(name: &str) -> String {
    format!("{}{}", METADATA_PREFIX, name)
}

/// Reject names that are empty or only whitespace.
///
/// Shared by registration, lookup and execution so that any name that can be
/// registered can also be executed.
pub fn validate_job_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(JobDockError::InvalidArgument(
            "job name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// How `register` turns "create if absent" into store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterStrategy {
    /// Single atomic `put_if_absent`. Concurrent registrations of one name
    /// have exactly one winner.
    #[default]
    ConditionalWrite,
    /// Read the key, then `put` if it was absent. Two concurrent
    /// registrations can both see the key absent and both write; the last
    /// write wins and neither caller sees an error.
    CheckThenWrite,
}

/// Job name to [`Metadata`] mapping layered on a [`KeyValueStore`].
///
/// Every call goes to the store; nothing is cached between calls.
pub struct JobRegistry {
    store: Arc<dyn KeyValueStore>,
    strategy: RegisterStrategy,
}

impl JobRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_strategy(store, RegisterStrategy::default())
    }

    pub fn with_strategy(store: Arc<dyn KeyValueStore>, strategy: RegisterStrategy) -> Self {
        Self { store, strategy }
    }

    /// Register `metadata` under `name`.
    ///
    /// Fails with `AlreadyExists` if the name is taken, `InvalidArgument` if
    /// the name is blank or disagrees with `metadata.name`, and a store error
    /// (kind `Internal`) if the backend call fails. When the existence check
    /// fails nothing is written.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        name: &str,
        mut metadata: Metadata,
    ) -> Result<Metadata> {
        validate_job_name(name)?;
        if metadata.name.is_empty() {
            metadata.name = name.to_string();
        } else if metadata.name != name {
            return Err(JobDockError::InvalidArgument(format!(
                "metadata name {:?} does not match job name {:?}",
                metadata.name, name
            )));
        }

        let key = metadata_key(name);
        let value = MetadataCodec::encode(&metadata);

        let created = match self.strategy {
            RegisterStrategy::ConditionalWrite => ctx
                .guard(self.store.put_if_absent(&key, value))
                .await?
                .map_err(|e| store_error("put_if_absent", &key, e))?,
            RegisterStrategy::CheckThenWrite => {
                let existing = ctx
                    .guard(self.store.get(&key))
                    .await?
                    .map_err(|e| store_error("get", &key, e))?;
                if existing.is_some() {
                    false
                } else {
                    ctx.guard(self.store.put(&key, value))
                        .await?
                        .map_err(|e| store_error("put", &key, e))?;
                    true
                }
            }
        };

        if !created {
            tracing::warn!(job = name, key = %key, "Job already registered");
            return Err(JobDockError::AlreadyExists { key });
        }

        tracing::info!(
            job = name,
            image = %metadata.image_reference,
            author = %metadata.author,
            "Job registered"
        );
        Ok(metadata)
    }

    /// Load the metadata registered under `name`.
    ///
    /// An absent key is `NotFound`. A stored value that does not decode, or
    /// decodes to a record for a different name, is reported as corrupt
    /// instead of being returned.
    pub async fn fetch(&self, ctx: &RequestContext, name: &str) -> Result<Metadata> {
        validate_job_name(name)?;

        let key = metadata_key(name);
        let bytes = ctx
            .guard(self.store.get(&key))
            .await?
            .map_err(|e| store_error("get", &key, e))?
            .ok_or_else(|| JobDockError::NotFound(name.to_string()))?;

        let metadata = MetadataCodec::decode(&bytes).map_err(|source| {
            tracing::error!(key = %key, error = %source, "Stored metadata does not decode");
            JobDockError::Decode {
                key: key.clone(),
                source,
            }
        })?;

        if metadata.name != name {
            tracing::error!(key = %key, found = %metadata.name, "Stored metadata name mismatch");
            return Err(JobDockError::CorruptRecord {
                key,
                found: metadata.name,
            });
        }

        Ok(metadata)
    }

    /// Names of all registered jobs, recovered from the scanned keys.
    pub async fn list(&self, ctx: &RequestContext) -> Result<JobList> {
        let entries = ctx
            .guard(self.store.scan(METADATA_PREFIX))
            .await?
            .map_err(|e| store_error("scan", METADATA_PREFIX, e))?;

        Ok(entries
            .into_iter()
            .filter_map(|(key, _)| key.strip_prefix(METADATA_PREFIX).map(str::to_string))
            .collect())
    }
}

fn store_error(op: &'static str, key: &str, source: StoreError) -> JobDockError {
    tracing::error!(op, key, error = %source, "Store call failed");
    JobDockError::Store {
        op,
        key: key.to_string(),
        source,
    }
}

pub mod codec;
pub mod job_registry;
pub mod metadata;

pub use codec::MetadataCodec;
pub use job_registry::{
    metadata_key, validate_job_name, JobRegistry, RegisterStrategy, METADATA_PREFIX,
};
pub use metadata::{JobList, Metadata};

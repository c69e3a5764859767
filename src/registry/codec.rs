use prost::Message;

use super::metadata::Metadata;
use crate::proto;

/// Serializes [`Metadata`] into the bytes kept in the store.
///
/// The stored form is the protobuf encoding of the wire `Metadata` message,
/// so records written by other clients of the same schema stay readable.
pub struct MetadataCodec;

impl MetadataCodec {
    pub fn encode(metadata: &Metadata) -> Vec<u8> {
        proto::Metadata::from(metadata.clone()).encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Metadata, prost::DecodeError> {
        proto::Metadata::decode(bytes).map(Metadata::from)
    }
}

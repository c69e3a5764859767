use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{JobDockError, Result};
use crate::proto;

/// Descriptive record registered for a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(alias = "image_name", alias = "imageName")]
    pub image_reference: String,
    #[serde(default)]
    pub description: String,
}

impl Metadata {
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        image_reference: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            image_reference: image_reference.into(),
            description: description.into(),
        }
    }

    /// Read a record from a JSON file such as
    /// `{"name": "resize", "author": "a", "imageName": "img/resize"}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            JobDockError::InvalidArgument(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            JobDockError::InvalidArgument(format!("invalid metadata in {}: {}", path.display(), e))
        })
    }
}

impl From<proto::Metadata> for Metadata {
    fn from(m: proto::Metadata) -> Self {
        Self {
            name: m.name,
            author: m.author,
            image_reference: m.image_name,
            description: m.description,
        }
    }
}

impl From<Metadata> for proto::Metadata {
    fn from(m: Metadata) -> Self {
        Self {
            name: m.name,
            author: m.author,
            image_name: m.image_reference,
            description: m.description,
        }
    }
}

/// Names of every registered job at the time of a list call.
pub type JobList = Vec<String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_field_names() {
        let m: Metadata = serde_json::from_str(
            r#"{"name":"resize","author":"a","imageName":"img/resize","description":"d"}"#,
        )
        .unwrap();
        assert_eq!(m, Metadata::new("resize", "a", "img/resize", "d"));
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let m: Metadata = serde_json::from_str(r#"{"image_reference":"img/x"}"#).unwrap();
        assert_eq!(m.image_reference, "img/x");
        assert!(m.name.is_empty());
        assert!(m.author.is_empty());
    }
}

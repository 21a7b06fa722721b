//! NFT-style metadata describing a saved project.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: String,
}

impl MetadataAttribute {
    fn new(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectMetadata {
    pub name: String,
    pub description: String,
    /// Thumbnail URL; empty until one is generated.
    pub image: String,
    pub external_url: String,
    pub attributes: Vec<MetadataAttribute>,
}

impl ProjectMetadata {
    pub fn build(
        name: &str,
        description: &str,
        creator: &str,
        data_cid: &str,
        data_url: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            image: String::new(),
            external_url: data_url,
            attributes: vec![
                MetadataAttribute::new("Creator", creator),
                MetadataAttribute::new("Data CID", data_cid),
                MetadataAttribute::new(
                    "Created At",
                    created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
            ],
        }
    }

    pub fn attribute(&self, trait_type: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| a.value.as_str())
    }
}

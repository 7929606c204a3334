//! Community metadata record

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata fields replicated for a community.
pub type CommunityMetadata = BTreeMap<String, Value>;

// == Community Record ==
/// Cached community metadata plus the locally derived `size`.
///
/// `size` is always overwritten from the cached publications; whatever the
/// remote payload carries in that field is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityRecord {
    pub id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(flatten)]
    pub metadata: CommunityMetadata,
}

impl CommunityRecord {
    /// Creates an empty record for a community the remote knows nothing about.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: 0,
            metadata: CommunityMetadata::new(),
        }
    }

    /// Returns a copy with `size` overlaid.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}

//! Publication records, patches and drafts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Publication Record ==
/// A content record inside a community. `id` is unique per community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub id: String,
    /// Size-bearing payload (data URI of the GIF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Author nickname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PublicationRecord {
    /// Byte length of `src`, zero when absent.
    pub fn content_len(&self) -> u64 {
        self.src.as_ref().map_or(0, |src| src.len() as u64)
    }

    /// Materializes a draft under a freshly assigned id.
    pub fn from_draft(
        id: impl Into<String>,
        draft: PublicationDraft,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            src: draft.src,
            hash: draft.hash,
            caption: draft.caption,
            nickname: draft.nickname,
            path: draft.path,
            created_at: Some(created_at),
        }
    }

    /// Field-presence merge: every `Some` in the patch overwrites.
    pub fn apply(&mut self, patch: PublicationPatch) {
        if patch.src.is_some() {
            self.src = patch.src;
        }
        if patch.hash.is_some() {
            self.hash = patch.hash;
        }
        if patch.caption.is_some() {
            self.caption = patch.caption;
        }
        if patch.nickname.is_some() {
            self.nickname = patch.nickname;
        }
        if patch.path.is_some() {
            self.path = patch.path;
        }
        if patch.created_at.is_some() {
            self.created_at = patch.created_at;
        }
    }
}

impl From<PublicationPatch> for PublicationRecord {
    fn from(patch: PublicationPatch) -> Self {
        Self {
            id: patch.id,
            src: patch.src,
            hash: patch.hash,
            caption: patch.caption,
            nickname: patch.nickname,
            path: patch.path,
            created_at: patch.created_at,
        }
    }
}

impl From<PublicationRecord> for PublicationPatch {
    fn from(record: PublicationRecord) -> Self {
        Self {
            id: record.id,
            src: record.src,
            hash: record.hash,
            caption: record.caption,
            nickname: record.nickname,
            path: record.path,
            created_at: record.created_at,
        }
    }
}

// == Publication Patch ==
/// Partial publication as delivered by metadata notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationPatch {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PublicationPatch {
    /// Metadata view of a full record (content dropped).
    pub fn metadata_of(record: &PublicationRecord) -> Self {
        Self {
            id: record.id.clone(),
            src: None,
            hash: record.hash.clone(),
            caption: record.caption.clone(),
            nickname: record.nickname.clone(),
            path: record.path.clone(),
            created_at: record.created_at,
        }
    }
}

// == Publication Draft ==
/// A publication about to be posted; the remote assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationDraft {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl PublicationDraft {
    /// Byte length of `src`, zero when absent.
    pub fn content_len(&self) -> u64 {
        self.src.as_ref().map_or(0, |src| src.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_len_missing_src_is_zero() {
        let record = PublicationRecord::from(PublicationPatch {
            id: "p1".to_string(),
            ..PublicationPatch::default()
        });
        assert_eq!(record.content_len(), 0);
    }

    #[test]
    fn test_apply_overwrites_present_fields_only() {
        let mut record = PublicationRecord {
            id: "p1".to_string(),
            src: Some("data".to_string()),
            hash: None,
            caption: Some("old".to_string()),
            nickname: Some("Ann".to_string()),
            path: None,
            created_at: None,
        };

        record.apply(PublicationPatch {
            id: "p1".to_string(),
            caption: Some("new".to_string()),
            ..PublicationPatch::default()
        });

        assert_eq!(record.caption.as_deref(), Some("new"));
        assert_eq!(record.src.as_deref(), Some("data"));
        assert_eq!(record.nickname.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_metadata_of_drops_content() {
        let record = PublicationRecord::from_draft(
            "p1",
            PublicationDraft {
                src: Some("abc".to_string()),
                caption: Some("hi".to_string()),
                ..PublicationDraft::default()
            },
            Utc::now(),
        );

        let metadata = PublicationPatch::metadata_of(&record);
        assert_eq!(metadata.src, None);
        assert_eq!(metadata.caption.as_deref(), Some("hi"));
    }
}

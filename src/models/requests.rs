//! Request DTOs for the local HTTP facade
//!
//! Defines the structure of incoming HTTP request bodies that are not
//! domain patches or drafts.

use serde::Deserialize;

/// Request body for POST /user/blacklist
#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistRequest {
    /// Community identifiers that must be left
    pub communities: Vec<String>,
}

impl BlacklistRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.communities.iter().any(|id| id.is_empty()) {
            return Some("Community id cannot be empty".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blacklist_request_deserialize() {
        let json = r#"{"communities": ["c1", "c2"]}"#;
        let req: BlacklistRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.communities, vec!["c1", "c2"]);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_blacklist_request_rejects_empty_id() {
        let req = BlacklistRequest {
            communities: vec![String::new()],
        };
        assert!(req.validate().is_some());
    }
}

//! Response DTOs for the local HTTP facade
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use super::defaults::{default_publications, PLACEHOLDER};
use super::{CommunityRecord, PublicationDraft};

/// Response body for GET /communities and membership mutations
#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    /// Joined community ids, most recently joined first
    pub communities: Vec<String>,
}

impl MembershipResponse {
    /// Creates a new MembershipResponse
    pub fn new(communities: Vec<String>) -> Self {
        Self { communities }
    }
}

/// Response body for GET /communities/:id
#[derive(Debug, Clone, Serialize)]
pub struct CommunityResponse {
    /// Community metadata with derived size
    #[serde(flatten)]
    pub community: CommunityRecord,
    /// Whether the local user belongs to it
    pub joined: bool,
}

impl CommunityResponse {
    /// Creates a new CommunityResponse
    pub fn new(community: CommunityRecord, joined: bool) -> Self {
        Self { community, joined }
    }
}

/// Response body for POST /communities/:id/publications
#[derive(Debug, Clone, Serialize)]
pub struct PostedResponse {
    /// Success message
    pub message: String,
    /// Id assigned by the backing store
    pub id: String,
}

impl PostedResponse {
    /// Creates a new PostedResponse
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Publication '{}' posted successfully", id),
            id,
        }
    }
}

/// Response body for GET /onboarding
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingResponse {
    /// Publications shown to users who have not joined anything yet
    pub publications: Vec<PublicationDraft>,
    /// Image shown while content loads
    pub placeholder: String,
}

impl Default for OnboardingResponse {
    fn default() -> Self {
        Self {
            publications: default_publications(),
            placeholder: PLACEHOLDER.to_string(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status
    pub status: String,
    /// Number of joined communities
    pub communities: usize,
}

impl HealthResponse {
    /// Creates a healthy response
    pub fn healthy(communities: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            communities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posted_response() {
        let resp = PostedResponse::new("p1");
        assert_eq!(resp.id, "p1");
        assert!(resp.message.contains("p1"));
    }

    #[test]
    fn test_community_response_flattens_record() {
        let resp = CommunityResponse::new(CommunityRecord::new("c1").with_size(6), true);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["size"], 6);
        assert_eq!(json["joined"], true);
    }

    #[test]
    fn test_onboarding_response() {
        let resp = OnboardingResponse::default();
        assert_eq!(resp.publications.len(), 3);
        assert_eq!(resp.placeholder, "/images/placeholder.png");
    }

    #[test]
    fn test_health_response() {
        let resp = HealthResponse::healthy(2);
        assert_eq!(resp.status, "healthy");
        assert_eq!(resp.communities, 2);
    }
}

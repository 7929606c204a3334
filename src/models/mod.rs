//! Domain records and DTOs
//!
//! Records mirror what the backing store replicates; patches carry the
//! explicit field-presence convention used when merging partial updates.

pub mod community;
pub mod defaults;
pub mod profile;
pub mod publication;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use community::{CommunityMetadata, CommunityRecord};
pub use profile::{Profile, ProfilePatch, GUEST_PREFIX, GUEST_SUFFIX_RANGE};
pub use publication::{PublicationDraft, PublicationPatch, PublicationRecord};
pub use requests::BlacklistRequest;
pub use responses::{
    CommunityResponse, HealthResponse, MembershipResponse, OnboardingResponse, PostedResponse,
};

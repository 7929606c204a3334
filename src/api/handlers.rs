//! API Handlers
//!
//! HTTP request handlers mapping each endpoint onto the store.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{Result, StoreError};
use crate::models::{
    BlacklistRequest, CommunityMetadata, CommunityResponse, HealthResponse, MembershipResponse,
    OnboardingResponse, PostedResponse, Profile, ProfilePatch, PublicationDraft, PublicationPatch,
    PublicationRecord,
};
use crate::store::Store;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide store
    pub store: Arc<Store>,
}

impl AppState {
    /// Creates a new AppState around an opened store.
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let joined = state.store.communities.len().await?;
    Ok(Json(HealthResponse::healthy(joined)))
}

/// Handler for GET /onboarding
///
/// Default publications and placeholder for the first-run screens.
pub async fn onboarding_handler() -> Json<OnboardingResponse> {
    Json(OnboardingResponse::default())
}

// == User ==

/// Handler for GET /user
pub async fn get_user_handler(State(state): State<AppState>) -> Result<Json<Profile>> {
    Ok(Json(state.store.user.get().await?))
}

/// Handler for PUT /user
///
/// Merges the body over the stored profile.
pub async fn put_user_handler(
    State(state): State<AppState>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Profile>> {
    Ok(Json(state.store.user.put(patch).await?))
}

/// Handler for POST /user/blacklist
///
/// Leaves every listed community; the follow-up warm-up runs detached.
pub async fn blacklist_handler(
    State(state): State<AppState>,
    Json(req): Json<BlacklistRequest>,
) -> Result<Json<MembershipResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(StoreError::InvalidArgument(error_msg));
    }

    let _warmup = state
        .store
        .user
        .remove_blacklisted_communities(&req.communities)
        .await?;

    Ok(Json(MembershipResponse::new(
        state.store.communities.get_all().await?,
    )))
}

// == Communities ==

/// Handler for GET /communities
pub async fn list_communities_handler(
    State(state): State<AppState>,
) -> Result<Json<MembershipResponse>> {
    Ok(Json(MembershipResponse::new(
        state.store.communities.get_all().await?,
    )))
}

/// Handler for PUT /communities/:id
pub async fn join_community_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MembershipResponse>> {
    state.store.communities.post(&id).await?;
    Ok(Json(MembershipResponse::new(
        state.store.communities.get_all().await?,
    )))
}

/// Handler for GET /communities/:id
pub async fn get_community_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommunityResponse>> {
    let community = state.store.communities.get(&id).await?;
    let record = community.get().await?;
    let joined = state.store.communities.has(&id).await?;
    Ok(Json(CommunityResponse::new(record, joined)))
}

/// Handler for PATCH /communities/:id
pub async fn put_community_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<CommunityMetadata>,
) -> Result<StatusCode> {
    let community = state.store.communities.get(&id).await?;
    community.put(data).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /communities/:id
pub async fn leave_community_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MembershipResponse>> {
    state.store.communities.delete(&id).await?;
    Ok(Json(MembershipResponse::new(
        state.store.communities.get_all().await?,
    )))
}

/// Handler for GET /communities/:id/peers
pub async fn peers_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>> {
    let community = state.store.communities.get(&id).await?;
    Ok(Json(community.get_online_peers().await?))
}

// == Publications ==

/// Handler for GET /communities/:id/publications
pub async fn list_publications_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PublicationRecord>>> {
    let community = state.store.communities.get(&id).await?;
    Ok(Json(community.get_all_publications().await?))
}

/// Handler for POST /communities/:id/publications
///
/// Drafts without inline content but with a hash are posted by hash.
pub async fn post_publication_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<PublicationDraft>,
) -> Result<(StatusCode, Json<PostedResponse>)> {
    if draft.src.is_none() && draft.hash.is_none() {
        return Err(StoreError::InvalidArgument(
            "Publication needs either src or hash".to_string(),
        ));
    }

    let community = state.store.communities.get(&id).await?;
    let publication_id = if draft.src.is_none() {
        community.publications().await.post_by_hash(draft).await?
    } else {
        community.post_publication(draft).await?
    };

    Ok((StatusCode::CREATED, Json(PostedResponse::new(publication_id))))
}

/// Handler for GET /communities/:id/publications/:publication_id
pub async fn get_publication_handler(
    State(state): State<AppState>,
    Path((id, publication_id)): Path<(String, String)>,
) -> Result<Json<PublicationRecord>> {
    let community = state.store.communities.get(&id).await?;
    community
        .publications()
        .await
        .get(&publication_id)
        .await?
        .map(Json)
        .ok_or_else(|| StoreError::NotFound(format!("publication '{}'", publication_id)))
}

/// Handler for PUT /communities/:id/publications/:publication_id
pub async fn put_publication_handler(
    State(state): State<AppState>,
    Path((id, publication_id)): Path<(String, String)>,
    Json(mut patch): Json<PublicationPatch>,
) -> Result<StatusCode> {
    patch.id = publication_id.clone();
    let community = state.store.communities.get(&id).await?;
    community
        .publications()
        .await
        .put(&publication_id, patch)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /communities/:id/publications/:publication_id
pub async fn delete_publication_handler(
    State(state): State<AppState>,
    Path((id, publication_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let community = state.store.communities.get(&id).await?;
    community.delete_publication(&publication_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

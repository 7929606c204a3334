//! API Module
//!
//! Local HTTP facade the presentation layer reads and writes through.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /onboarding` - Default publications for first-run screens
//! - `GET|PUT /user` - Read or patch the profile
//! - `POST /user/blacklist` - Leave blacklisted communities
//! - `GET /communities` - Joined community ids
//! - `PUT|GET|PATCH|DELETE /communities/:id` - Join, read, update metadata, leave
//! - `GET /communities/:id/peers` - Online peers
//! - `GET|POST /communities/:id/publications` - List or post publications
//! - `GET|PUT|DELETE /communities/:id/publications/:publication_id`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

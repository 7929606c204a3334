//! Onboarding defaults shown before a community has content.

use super::PublicationDraft;

/// Placeholder image path for publications whose content is not loaded yet.
pub const PLACEHOLDER: &str = "/images/placeholder.png";

const ONBOARDING: [(&str, &str, &str); 3] = [
    (
        "QmQKooJPWpYY2v7CB4shGKa7UVcbE3Z61sGjibb3aFkXb1",
        "Create New GIF",
        "/onboarding-gifs/create-new-gif.gif",
    ),
    (
        "QmSPJAfNidu4ofwhApeRneYeqpoBoJURWHaopvBnEV6GGp",
        "Share Your Community",
        "/onboarding-gifs/share-your-community.gif",
    ),
    (
        "QmRTooGFkG19BZMuUXoXYDMKLkeaTXxohPDErcGea9YrD2",
        "Welcome to Thicket",
        "/onboarding-gifs/welcome-to-thicket.gif",
    ),
];

/// The onboarding publications, authored by "Thicket".
pub fn default_publications() -> Vec<PublicationDraft> {
    ONBOARDING
        .iter()
        .map(|(hash, caption, path)| PublicationDraft {
            src: None,
            hash: Some(hash.to_string()),
            caption: Some(caption.to_string()),
            nickname: Some("Thicket".to_string()),
            path: Some(path.to_string()),
        })
        .collect()
}

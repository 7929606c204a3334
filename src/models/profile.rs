//! User profile record
//!
//! One profile per local installation, persisted under the `user` key.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix of generated nicknames.
pub const GUEST_PREFIX: &str = "Guest";

/// Inclusive range the default guest suffix is drawn from.
pub const GUEST_SUFFIX_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;

// == Profile ==
/// The local user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name broadcast to every joined community
    pub nickname: String,
    /// Whether onboarding has been completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarded: Option<bool>,
    /// Whether the welcome screen has been dismissed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_welcome: Option<bool>,
}

impl Profile {
    /// Creates a fresh profile with a `Guest<n>` nickname, n in 1..=1000.
    pub fn guest() -> Self {
        let suffix = rand::thread_rng().gen_range(GUEST_SUFFIX_RANGE);
        Self {
            nickname: format!("{}{}", GUEST_PREFIX, suffix),
            onboarded: None,
            seen_welcome: None,
        }
    }

    /// Shallow-merges a patch: present fields overwrite, absent ones are kept.
    pub fn apply(&mut self, patch: ProfilePatch) {
        if let Some(nickname) = patch.nickname {
            self.nickname = nickname;
        }
        if let Some(onboarded) = patch.onboarded {
            self.onboarded = Some(onboarded);
        }
        if let Some(seen_welcome) = patch.seen_welcome {
            self.seen_welcome = Some(seen_welcome);
        }
    }
}

// == Profile Patch ==
/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub onboarded: Option<bool>,
    #[serde(default)]
    pub seen_welcome: Option<bool>,
}

impl ProfilePatch {
    /// Patch that only renames the user.
    pub fn nickname(nickname: impl Into<String>) -> Self {
        Self {
            nickname: Some(nickname.into()),
            ..Self::default()
        }
    }

    /// Validates the patch
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match &self.nickname {
            Some(nickname) if nickname.trim().is_empty() => {
                Some("Nickname cannot be empty".to_string())
            }
            _ => None,
        }
    }
}

//! Identity and per-user profile model.
//!
//! # Invariants
//! - One profile per identity; `profile.id == identity.uid`.
//! - `level >= 1` for profiles created by this crate.
//! - `starred_set_ids` has set semantics (no duplicates); order is the
//!   order stars were added.

use crate::model::catalog::SetId;
use serde::{Deserialize, Serialize};

/// Stable identifier of an authenticated principal.
pub type UserId = String;

/// Authenticated principal as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: UserId,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Per-user progress and favorites record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(rename = "name")]
    pub display_name: String,
    pub level: u32,
    pub experience: u64,
    #[serde(rename = "starredSets", default)]
    pub starred_set_ids: Vec<SetId>,
}

/// Position inside the current level, e.g. "40/100 XP".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub experience_into_level: u64,
    pub level_size: u64,
}

impl Profile {
    /// Default profile for a first observed login.
    ///
    /// Display name falls back to `fallback_name` when the identity has none
    /// (or only whitespace).
    pub fn new_default(identity: &Identity, fallback_name: &str) -> Self {
        let display_name = identity
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback_name)
            .to_string();
        Self {
            id: identity.uid.clone(),
            display_name,
            level: 1,
            experience: 0,
            starred_set_ids: Vec::new(),
        }
    }

    pub fn is_starred(&self, set_id: &str) -> bool {
        self.starred_set_ids.iter().any(|id| id == set_id)
    }

    /// Starred ids after toggling `set_id`: removed when present, appended
    /// otherwise. Does not mutate `self`.
    pub fn toggled_starred(&self, set_id: &str) -> Vec<SetId> {
        if self.is_starred(set_id) {
            self.starred_set_ids
                .iter()
                .filter(|id| id.as_str() != set_id)
                .cloned()
                .collect()
        } else {
            let mut next = self.starred_set_ids.clone();
            next.push(set_id.to_string());
            next
        }
    }

    /// `level_size` must be positive (enforced by config validation).
    pub fn level_progress(&self, level_size: u64) -> LevelProgress {
        LevelProgress {
            level: self.level,
            experience_into_level: self.experience % level_size,
            level_size,
        }
    }

    /// `(level, experience)` after granting `points`.
    ///
    /// Level is derived from total experience but never decreases below the
    /// stored level.
    pub fn with_experience_granted(&self, points: u64, level_size: u64) -> (u32, u64) {
        let experience = self.experience.saturating_add(points);
        let derived = 1 + experience / level_size;
        let derived = u32::try_from(derived).unwrap_or(u32::MAX);
        (derived.max(self.level), experience)
    }
}

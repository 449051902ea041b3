//! Identity provider: authenticated identity plus per-user profile.
//!
//! # Responsibility
//! - Observe auth identity changes for the provider's lifetime.
//! - Fetch the profile for each observed identity, creating a default one
//!   on first login.
//! - Toggle starred sets and grant experience, writing through the store.
//!
//! # Invariants
//! - `Unauthenticated -> LoadingProfile -> Ready`; losing the identity
//!   returns to `Unauthenticated` and clears the profile.
//! - `is_loading()` stays true until the first identity notification has
//!   been fully applied.
//! - Local profile mutations are applied only after the store acknowledged
//!   the write, and are never rolled back later.
//!
//! Profile creation is not transactional: two clients logging in for the
//! first time at once may both write a default profile, the last write wins.

use crate::auth::AuthService;
use crate::config::SyncConfig;
use crate::model::encode;
use crate::model::profile::{Identity, LevelProgress, Profile};
use crate::provider::{ProviderError, ProviderResult};
use crate::store::{DocumentStore, StorePaths, Subscription};
use log::{debug, info};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// Lifecycle of the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    Unauthenticated,
    LoadingProfile,
    Ready,
}

#[derive(Serialize)]
struct StarredSetsUpdate<'a> {
    #[serde(rename = "starredSets")]
    starred_set_ids: &'a [String],
}

#[derive(Serialize)]
struct ExperienceUpdate {
    level: u32,
    experience: u64,
}

/// Owns the current identity and its profile.
pub struct IdentityProvider {
    store: Arc<dyn DocumentStore>,
    paths: StorePaths,
    default_display_name: String,
    level_size: u64,
    events: Receiver<Option<Identity>>,
    auth_subscription: Option<Subscription>,
    identity: Option<Identity>,
    profile: Option<Profile>,
    loading: bool,
}

impl IdentityProvider {
    /// Subscribes to `auth`; the first notification is queued immediately
    /// and applied by the next `process_events`.
    pub fn new(auth: &dyn AuthService, store: Arc<dyn DocumentStore>, config: &SyncConfig) -> Self {
        let (sender, events) = mpsc::channel();
        let auth_subscription = auth.subscribe_identity(Arc::new(move |identity: Option<Identity>| {
            // Receiver gone means the provider was dropped.
            let _ = sender.send(identity);
        }));

        Self {
            store,
            paths: StorePaths::new(config),
            default_display_name: config.default_display_name.clone(),
            level_size: config.experience_per_level,
            events,
            auth_subscription: Some(auth_subscription),
            identity: None,
            profile: None,
            loading: true,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn state(&self) -> IdentityState {
        match (&self.identity, &self.profile) {
            (None, _) => IdentityState::Unauthenticated,
            (Some(_), None) => IdentityState::LoadingProfile,
            (Some(_), Some(_)) => IdentityState::Ready,
        }
    }

    pub fn level_progress(&self) -> Option<LevelProgress> {
        self.profile
            .as_ref()
            .map(|profile| profile.level_progress(self.level_size))
    }

    /// Applies queued identity notifications in arrival order.
    ///
    /// Returns the number applied. Stops at the first failing profile
    /// fetch; the identity stays set with no profile (`LoadingProfile`).
    pub fn process_events(&mut self) -> ProviderResult<usize> {
        let mut applied = 0;
        while let Ok(identity) = self.events.try_recv() {
            self.apply_identity(identity)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn apply_identity(&mut self, identity: Option<Identity>) -> ProviderResult<()> {
        self.profile = None;
        self.identity = identity.clone();
        match identity {
            Some(identity) => {
                info!(
                    "event=identity_changed module=identity status=signed_in uid={}",
                    identity.uid
                );
                self.profile = Some(self.fetch_or_create_profile(&identity)?);
            }
            None => info!("event=identity_changed module=identity status=signed_out"),
        }
        self.loading = false;
        Ok(())
    }

    /// Reads the identity's profile, persisting a default one when absent.
    pub fn fetch_or_create_profile(&self, identity: &Identity) -> ProviderResult<Profile> {
        let path = self.paths.profile(&identity.uid)?;
        if let Some(fields) = self.store.get_document(&path)? {
            let profile: Profile = crate::model::decode(&fields)
                .map_err(|err| ProviderError::invalid_document(&path, err))?;
            info!(
                "event=profile_loaded module=identity status=adopted uid={}",
                identity.uid
            );
            return Ok(profile);
        }

        let profile = Profile::new_default(identity, &self.default_display_name);
        let fields = encode(&profile).map_err(|err| ProviderError::invalid_document(&path, err))?;
        self.store.set_document(&path, fields)?;
        info!(
            "event=profile_loaded module=identity status=created uid={}",
            identity.uid
        );
        Ok(profile)
    }

    /// Stars `set_id` if not starred, unstars it otherwise.
    ///
    /// No-op unless `Ready`. The full starred list is written, then local
    /// state is updated to match.
    pub fn toggle_star_set(&mut self, set_id: &str) -> ProviderResult<()> {
        let (Some(identity), Some(profile)) = (&self.identity, &self.profile) else {
            debug!("event=toggle_star module=identity status=skipped reason=not_ready");
            return Ok(());
        };
        let path = self.paths.profile(&identity.uid)?;
        let starred = profile.toggled_starred(set_id);
        let fields = encode(&StarredSetsUpdate {
            starred_set_ids: &starred,
        })
        .map_err(|err| ProviderError::invalid_document(&path, err))?;

        self.store.update_fields(&path, fields)?;
        info!(
            "event=toggle_star module=identity status=ok set_id={} starred_count={}",
            set_id,
            starred.len()
        );
        if let Some(profile) = self.profile.as_mut() {
            profile.starred_set_ids = starred;
        }
        Ok(())
    }

    /// Adds experience points, re-deriving the level. No-op unless `Ready`.
    pub fn grant_experience(&mut self, points: u64) -> ProviderResult<()> {
        let (Some(identity), Some(profile)) = (&self.identity, &self.profile) else {
            debug!("event=grant_experience module=identity status=skipped reason=not_ready");
            return Ok(());
        };
        if points == 0 {
            return Ok(());
        }
        let path = self.paths.profile(&identity.uid)?;
        let (level, experience) = profile.with_experience_granted(points, self.level_size);
        let fields = encode(&ExperienceUpdate { level, experience })
            .map_err(|err| ProviderError::invalid_document(&path, err))?;

        self.store.update_fields(&path, fields)?;
        info!(
            "event=grant_experience module=identity status=ok points={} level={}",
            points, level
        );
        if let Some(profile) = self.profile.as_mut() {
            profile.level = level;
            profile.experience = experience;
        }
        Ok(())
    }

    /// Cancels the auth subscription. Queued notifications are discarded.
    pub fn dispose(&mut self) {
        self.auth_subscription = None;
        while self.events.try_recv().is_ok() {}
    }
}

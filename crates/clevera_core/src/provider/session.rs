//! Wiring of identity and catalog providers on one event thread.
//!
//! # Invariants
//! - The catalog always observes the identity provider's current identity
//!   before catalog notifications are applied.
//! - `pump` returns only once both providers' queues are empty.

use crate::auth::AuthService;
use crate::config::SyncConfig;
use crate::model::catalog::StudySet;
use crate::provider::catalog::CatalogProvider;
use crate::provider::identity::IdentityProvider;
use crate::provider::ProviderResult;
use crate::store::DocumentStore;
use log::debug;
use std::sync::Arc;

/// Both providers, driven together.
pub struct SyncSession {
    identity: IdentityProvider,
    catalog: CatalogProvider,
}

impl SyncSession {
    pub fn new(auth: &dyn AuthService, store: Arc<dyn DocumentStore>, config: &SyncConfig) -> Self {
        Self {
            identity: IdentityProvider::new(auth, Arc::clone(&store), config),
            catalog: CatalogProvider::new(store, config),
        }
    }

    pub fn identity(&self) -> &IdentityProvider {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut IdentityProvider {
        &mut self.identity
    }

    pub fn catalog(&self) -> &CatalogProvider {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CatalogProvider {
        &mut self.catalog
    }

    /// Drains identity and catalog notifications until both are quiescent.
    ///
    /// Returns the total number of notifications applied.
    pub fn pump(&mut self) -> ProviderResult<usize> {
        let mut total = 0;
        loop {
            let identity_events = self.identity.process_events()?;
            self.catalog.observe_identity(self.identity.identity())?;
            let catalog_events = self.catalog.process_events()?;
            if identity_events + catalog_events == 0 {
                break;
            }
            total += identity_events + catalog_events;
        }
        debug!("event=pump module=session status=ok applied={total}");
        Ok(total)
    }

    /// Starred sets of the current profile that are currently mirrored.
    pub fn starred_sets(&self) -> Vec<&StudySet> {
        match self.identity.profile() {
            Some(profile) => self.catalog.starred_sets(profile),
            None => Vec::new(),
        }
    }

    /// Cancels every subscription owned by either provider.
    pub fn dispose(&mut self) {
        self.catalog.dispose();
        self.identity.dispose();
    }
}

//! Authentication collaborator contract.
//!
//! # Responsibility
//! - Report the current identity and push identity changes.
//! - Provide an in-process implementation for tests and the CLI.
//!
//! # Invariants
//! - A new identity subscriber is notified immediately with the current
//!   identity (or `None`).
//! - Providers only observe identity; sign-in/out is driven from outside.

use crate::model::profile::Identity;
use crate::store::Subscription;
use log::info;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback invoked with every identity change.
pub type IdentitySink = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// External auth service seam.
pub trait AuthService: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
    /// Subscribes to identity changes; fires once immediately.
    fn subscribe_identity(&self, sink: IdentitySink) -> Subscription;
}

#[derive(Default)]
struct AuthState {
    current: Option<Identity>,
    listeners: BTreeMap<u64, IdentitySink>,
    next_listener_id: u64,
}

/// In-process auth service.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryAuth {
    state: Arc<Mutex<AuthState>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, identity: Identity) {
        info!("event=sign_in module=auth status=ok uid={}", identity.uid);
        self.publish(Some(identity));
    }

    pub fn sign_out(&self) {
        info!("event=sign_out module=auth status=ok");
        self.publish(None);
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, identity: Option<Identity>) {
        let sinks: Vec<IdentitySink> = {
            let mut state = self.lock();
            state.current = identity.clone();
            state.listeners.values().cloned().collect()
        };
        for sink in sinks {
            sink(identity.clone());
        }
    }
}

impl AuthService for MemoryAuth {
    fn current_identity(&self) -> Option<Identity> {
        self.lock().current.clone()
    }

    fn subscribe_identity(&self, sink: IdentitySink) -> Subscription {
        let (listener_id, current) = {
            let mut state = self.lock();
            state.next_listener_id += 1;
            let listener_id = state.next_listener_id;
            state.listeners.insert(listener_id, Arc::clone(&sink));
            (listener_id, state.current.clone())
        };
        sink(current);

        let weak: Weak<Mutex<AuthState>> = Arc::downgrade(&self.state);
        Subscription::new(listener_id, move || {
            if let Some(state) = weak.upgrade() {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                state.listeners.remove(&listener_id);
            }
        })
    }
}

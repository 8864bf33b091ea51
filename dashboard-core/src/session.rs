//! Signed-in session state and its observers.
//!
//! The identity provider itself lives outside this crate; whatever drives it
//! pushes state changes into a [`SessionHub`], and views subscribe to it.
//! A [`Subscription`] unregisters its observer when dropped.

use parking_lot::{Mutex, ReentrantMutex};
use std::{collections::BTreeMap, sync::Arc};

use crate::error::DashboardError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(Identity),
}

impl AuthState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::SignedIn(identity) => Some(identity),
            AuthState::SignedOut => None,
        }
    }
}

type Observer = Arc<dyn Fn(&AuthState) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    state: AuthState,
    next_id: u64,
    observers: BTreeMap<u64, Observer>,
}

#[derive(Clone, Default)]
pub struct SessionHub {
    inner: Arc<Mutex<HubInner>>,
    // Held while observers run, so every observer sees states in the order
    // they were set. Reentrant so an observer may itself sign in or out.
    delivery: Arc<ReentrantMutex<()>>,
}

impl std::fmt::Debug for SessionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SessionHub")
            .field("state", &inner.state)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AuthState {
        self.inner.lock().state.clone()
    }

    /// Register `observer`. It is called right away with the current state and
    /// again on every change until the returned guard is dropped. Calls arrive
    /// in the order the states were set.
    #[must_use = "dropping the subscription unregisters the observer"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        let _delivery = self.delivery.lock();
        let (id, state) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.insert(id, observer.clone());
            (id, inner.state.clone())
        };
        observer(&state);

        Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Replace the session state and notify observers if it changed.
    pub fn set_state(&self, state: AuthState) {
        let _delivery = self.delivery.lock();
        // Observers run outside the state lock so they may query the hub.
        let observers: Vec<Observer> = {
            let mut inner = self.inner.lock();
            if inner.state == state {
                return;
            }
            inner.state = state.clone();
            inner.observers.values().cloned().collect()
        };
        tracing::info!(signed_in = state.identity().is_some(), "session state changed");

        for observer in &observers {
            observer(&state);
        }
    }

    pub fn sign_in(&self, display_name: impl Into<String>) {
        self.set_state(AuthState::SignedIn(Identity {
            display_name: display_name.into(),
        }));
    }

    pub fn sign_out(&self) {
        self.set_state(AuthState::SignedOut);
    }

    /// Gate for the dashboard view.
    pub fn require_identity(&self) -> Result<Identity, DashboardError> {
        self.state()
            .identity()
            .cloned()
            .ok_or(DashboardError::SignInRequired)
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }
}

/// Disposer returned by [`SessionHub::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    hub: std::sync::Weak<Mutex<HubInner>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.lock().observers.remove(&self.id);
        }
    }
}

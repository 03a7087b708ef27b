//! Adapter-state event dispatch
//!
//! [`AdapterStateDispatcher`] keeps a registry of "when the adapter reports
//! state X, run action Y". It holds a subscription on the platform event
//! source only while the registry is non-empty.
//!
//! Events are handled one at a time: a second event waits until the
//! previous action has returned. Bindings are not removed when they fire.
//! Callers that want one-shot behaviour unregister from inside the action,
//! which is safe because actions run outside the registry lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, warn};

use crate::radio::{AdapterState, AdapterStateSink, EventKind, EventSource, SubscriptionHandle};

/// Action bound to an adapter state
pub type StateAction = Arc<dyn Fn() + Send + Sync>;

// ----------------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Subscription {
    handle: SubscriptionHandle,
    generation: u64,
}

#[derive(Default)]
struct Registry {
    bindings: HashMap<AdapterState, StateAction>,
    subscription: Option<Subscription>,
    generation: u64,
}

struct DispatcherInner {
    events: Arc<dyn EventSource>,
    registry: Mutex<Registry>,
    /// Held across lookup and action so events are handled in turn
    dispatching: Mutex<()>,
}

impl DispatcherInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up and run the action for `state`. Events tagged with a
    /// subscription generation are dropped unless that subscription is
    /// still the live one.
    fn dispatch(&self, generation: Option<u64>, state: AdapterState) {
        let _serial = self.dispatching.lock().unwrap_or_else(PoisonError::into_inner);
        let action = {
            let registry = self.registry();
            if let Some(generation) = generation {
                let live = registry.subscription.map(|s| s.generation);
                if live != Some(generation) {
                    debug!("Ignoring {} from stale subscription {}", state, generation);
                    return;
                }
            }
            registry.bindings.get(&state).cloned()
        };

        match action {
            Some(action) => {
                info!("Calling back on adapter state {}", state);
                action();
            }
            None => debug!("No binding for adapter state {}", state),
        }
    }
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        let subscription = self.registry().subscription.take();
        if let Some(subscription) = subscription {
            self.events.unsubscribe(subscription.handle);
        }
    }
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

/// Routes adapter-state events to registered actions.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct AdapterStateDispatcher {
    inner: Arc<DispatcherInner>,
}

impl AdapterStateDispatcher {
    pub fn new(events: Arc<dyn EventSource>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                events,
                registry: Mutex::new(Registry::default()),
                dispatching: Mutex::new(()),
            }),
        }
    }

    /// Bind `action` to the next report of `state`, replacing any existing
    /// binding for that state.
    pub fn register<F>(&self, state: AdapterState, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        debug!("register({})", state);
        let mut registry = self.inner.registry();

        if registry.subscription.is_none() {
            registry.generation += 1;
            let generation = registry.generation;
            let handle = self
                .inner
                .events
                .subscribe(EventKind::AdapterStateChanged, self.sink(generation));
            registry.subscription = Some(Subscription { handle, generation });
            info!("Subscribed to adapter state changes ({:?})", handle);
        }

        if registry.bindings.insert(state, Arc::new(action)).is_some() {
            warn!("Adapter state {} already registered, replacing binding", state);
        }
    }

    /// Remove the binding for `state`. Unsubscribes from the event source
    /// once no bindings remain.
    pub fn unregister(&self, state: AdapterState) {
        debug!("unregister({})", state);
        let mut registry = self.inner.registry();

        if registry.bindings.remove(&state).is_none() {
            warn!("Adapter state {} is not registered", state);
        } else if registry.bindings.is_empty() {
            if let Some(subscription) = registry.subscription.take() {
                self.inner.events.unsubscribe(subscription.handle);
                info!("Unsubscribed from adapter state changes ({:?})", subscription.handle);
            }
        }
    }

    /// Deliver a reported adapter state
    pub fn on_event(&self, state: AdapterState) {
        self.inner.dispatch(None, state);
    }

    /// Whether the dispatcher currently holds an event-source subscription
    pub fn is_subscribed(&self) -> bool {
        self.inner.registry().subscription.is_some()
    }

    /// States with a pending binding, in ascending order
    pub fn registered_states(&self) -> Vec<AdapterState> {
        let mut states: Vec<_> = self.inner.registry().bindings.keys().copied().collect();
        states.sort();
        states
    }

    fn sink(&self, generation: u64) -> AdapterStateSink {
        let inner: Weak<DispatcherInner> = Arc::downgrade(&self.inner);
        Arc::new(move |state| {
            if let Some(inner) = inner.upgrade() {
                inner.dispatch(Some(generation), state);
            }
        })
    }
}

impl std::fmt::Debug for AdapterStateDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterStateDispatcher")
            .field("registered", &self.registered_states())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

//! Listener registry.
//!
//! The registry is the single mutable collection at the heart of dispatch.
//! Scripts add listeners at startup, conversation waits add and remove them at
//! runtime, and the dispatcher reads it once per event.
//!
//! # Snapshot iteration
//!
//! [`ListenerRegistry::snapshot`] copies the current listener handles out of
//! the lock. The dispatcher iterates that copy, so a listener that removes
//! itself (or adds another) while a pass is running never disturbs the pass:
//! everything present when the event arrived is considered exactly once, and
//! nothing added during the pass is.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use parley_core::{Event, Predicate};

use crate::bot::Bot;
use crate::handler::BoxedHandler;

/// Opaque identity of a registered listener.
///
/// Two listeners with identical predicates and actions are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Extra synchronous check run after the predicate matched.
///
/// Commands use it for regex and direct-address checks so that a message
/// that only looks like a command never costs a spawned task.
pub type EventFilter = Arc<dyn Fn(&Bot, &Event) -> bool + Send + Sync>;

/// Closure run on the dispatcher itself.
pub type InlineAction = Arc<dyn Fn(&Event) + Send + Sync>;

/// What happens when a listener matches.
#[derive(Clone)]
pub enum ListenerAction {
    /// Spawn the handler as an independent, failure-contained task.
    Spawn(BoxedHandler),
    /// Run a short, non-blocking closure in-line during the pass.
    ///
    /// Used to resume conversation waits, which must observe events in the
    /// order they arrive.
    Inline(InlineAction),
}

impl fmt::Debug for ListenerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(_) => f.write_str("Spawn"),
            Self::Inline(_) => f.write_str("Inline"),
        }
    }
}

/// A listener before it is registered.
#[derive(Clone)]
pub struct ListenerSpec {
    name: String,
    predicate: Predicate,
    filter: Option<EventFilter>,
    action: ListenerAction,
}

impl ListenerSpec {
    /// A listener that spawns `handler` for every matching event.
    pub fn spawn(name: impl Into<String>, predicate: Predicate, handler: BoxedHandler) -> Self {
        Self {
            name: name.into(),
            predicate,
            filter: None,
            action: ListenerAction::Spawn(handler),
        }
    }

    /// A listener that runs `action` in-line for every matching event.
    pub fn inline<F>(name: impl Into<String>, predicate: Predicate, action: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate,
            filter: None,
            action: ListenerAction::Inline(Arc::new(action)),
        }
    }

    /// Adds a synchronous filter checked after the predicate.
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// A registered listener: a predicate paired with an action.
pub struct Listener {
    id: ListenerId,
    name: String,
    predicate: Predicate,
    filter: Option<EventFilter>,
    action: ListenerAction,
}

impl Listener {
    /// Returns the listener identity.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Returns the name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the listener predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Returns the action run on a match.
    pub fn action(&self) -> &ListenerAction {
        &self.action
    }

    /// Returns `true` if the predicate and the optional filter accept `event`.
    pub fn accepts(&self, bot: &Bot, event: &Event) -> bool {
        if !self.predicate.matches(event) {
            return false;
        }
        match &self.filter {
            Some(filter) => filter(bot, event),
            None => true,
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("predicate", &self.predicate)
            .field("filter", &self.filter.is_some())
            .field("action", &self.action)
            .finish()
    }
}

#[derive(Default)]
struct RegistryInner {
    listeners: Mutex<Vec<Arc<Listener>>>,
    next_id: AtomicU64,
}

/// The shared, ordered collection of listeners.
///
/// Cloning yields another handle to the same collection.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its identity.
    ///
    /// The listener takes part in every dispatch pass that starts after this
    /// call returns.
    pub fn add(&self, spec: ListenerSpec) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        trace!(listener = %spec.name, id = %id, "Adding listener");
        let listener = Arc::new(Listener {
            id,
            name: spec.name,
            predicate: spec.predicate,
            filter: spec.filter,
            action: spec.action,
        });
        self.inner.listeners.lock().push(listener);
        id
    }

    /// Removes a listener by identity.
    ///
    /// Returns `false` if it was already gone; removing twice is harmless.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        match listeners.iter().position(|l| l.id == id) {
            Some(index) => {
                let removed = listeners.remove(index);
                trace!(listener = %removed.name, id = %id, "Removed listener");
                true
            }
            None => false,
        }
    }

    /// Returns `true` if a listener with this identity is registered.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.inner.listeners.lock().iter().any(|l| l.id == id)
    }

    /// Copies the current listeners in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Listener>> {
        self.inner.listeners.lock().clone()
    }

    /// Returns the identities of the current listeners in registration order.
    pub fn ids(&self) -> Vec<ListenerId> {
        self.inner.listeners.lock().iter().map(|l| l.id).collect()
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> ListenerSpec {
        ListenerSpec::inline(name, Predicate::event_type("message"), |_| {})
    }

    #[test]
    fn test_add_then_remove_restores_set() {
        let registry = ListenerRegistry::new();
        let a = registry.add(noop("a"));
        let before = registry.ids();

        let b = registry.add(noop("b"));
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(b));

        assert_eq!(registry.ids(), before);
        assert!(registry.contains(a));
        assert!(!registry.contains(b));
    }

    #[test]
    fn test_identical_listeners_are_distinct() {
        let registry = ListenerRegistry::new();
        let a = registry.add(noop("same"));
        let b = registry.add(noop("same"));
        assert_ne!(a, b);

        assert!(registry.remove(a));
        assert!(registry.contains(b));
    }

    #[test]
    fn test_remove_twice_is_harmless() {
        let registry = ListenerRegistry::new();
        let id = registry.add(noop("a"));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_changes() {
        let registry = ListenerRegistry::new();
        let a = registry.add(noop("a"));
        let snapshot = registry.snapshot();

        registry.remove(a);
        registry.add(noop("b"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), a);
        assert_eq!(snapshot[0].name(), "a");
    }

    #[test]
    fn test_clones_share_listeners() {
        let registry = ListenerRegistry::new();
        let other = registry.clone();
        let id = registry.add(noop("a"));
        assert!(other.contains(id));
    }
}

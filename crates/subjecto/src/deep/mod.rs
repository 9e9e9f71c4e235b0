#![forbid(unsafe_code)]

//! Path-addressed subject over a nested [`Value`] tree.
//!
//! Mutations go through observed nodes ([`ObservedObject`],
//! [`ObservedArray`]) handed out by [`DeepSubject::get_value`]. Every write
//! knows its path and notifies the subscribers whose pattern selects it.
//!
//! # Invariants
//!
//! 1. Every container reachable through an observed node carries one path
//!    tag. The tag is kept while the container still sits at that path, so
//!    re-reading through a cycle returns a node with the same tag and
//!    terminates. A container that moved is re-tagged where it was read or
//!    written.
//! 2. Patterns are notified in the order they were first registered, exact
//!    subscribers of the mutated path first.
//! 3. No `RefCell` borrow is held while a subscriber, `before`, or the debug
//!    hook runs; subscribers may mutate the tree or the registry.
//! 4. A subscriber removed during a notification cycle is not called for the
//!    rest of that cycle.
//!
//! # Failure Modes
//!
//! - **Subscriber panics**: caught, logged at `ERROR`, delivery continues.
//! - **Writes after the subject is dropped**: applied to the data, nobody is
//!   notified.

mod cache;
mod observed;
mod registry;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

pub use observed::{MAX_PADDING, Observed, ObservedArray, ObservedObject};

use crate::debug::DebugHook;
use crate::options::DeepSubjectOptions;
use crate::path;
use crate::subscription::{SubscriptionId, deliver};
use crate::value::Value;
use cache::{NodeTag, WrapperCache};
use registry::{Handler, PathRegistry, Target};

type Transform = Rc<dyn Fn(Value) -> Value>;

pub(crate) struct DeepState {
    root: RefCell<Value>,
    cache: RefCell<WrapperCache>,
    registry: RefCell<PathRegistry>,
    next_id: Cell<SubscriptionId>,
    before: RefCell<Option<Transform>>,
    debug: RefCell<DebugHook<Value>>,
    options: DeepSubjectOptions,
}

impl DeepState {
    fn value_at(&self, at: &str) -> Option<Value> {
        let root = self.root.borrow().clone();
        root.pointer(at)
    }

    /// Tag for a container seen at `at`.
    pub(crate) fn tag(&self, value: &Value, at: &str) -> Option<Rc<NodeTag>> {
        let key = value.container_key()?;
        let cached = self.cache.borrow().tag_of(key);
        if let Some(tag) = cached
            && (tag.path == at || self.holds(&tag.path, value))
        {
            return Some(tag);
        }
        self.cache.borrow_mut().retag(value, at)
    }

    /// Whether `at` currently resolves to the container `value`.
    fn holds(&self, at: &str, value: &Value) -> bool {
        self.value_at(at).is_some_and(|current| current.strict_eq(value))
    }

    /// Deliver a mutation at `mutated` to every interested subscriber.
    pub(crate) fn notify(&self, mutated: &str) {
        let plan = self.registry.borrow().plan(mutated);
        tracing::trace!(
            message = "deep.notify",
            subject = %self.options.name,
            path = mutated,
            patterns = plan.len(),
        );

        for delivery in plan {
            let value = match &delivery.target {
                Target::Exact(at) => self.value_at(at),
                Target::Root => Some(self.root.borrow().clone()),
                Target::At(at) => match self.value_at(at) {
                    Some(value) => Some(value),
                    None => continue,
                },
            };
            self.deliver_all(&delivery.pattern, delivery.subscribers, &value);
        }
    }

    fn deliver_all(&self, pattern: &str, subscribers: Vec<(SubscriptionId, Handler)>, value: &Option<Value>) {
        for (id, handler) in subscribers {
            if !self.registry.borrow().contains(pattern, id) {
                continue;
            }
            deliver(&self.options.name, id, || handler(value.clone()));
        }
    }
}

/// A subject whose subscribers listen to paths inside a nested value.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use serde_json::json;
/// use subjecto::{DeepSubject, Value};
///
/// let subject = DeepSubject::new(json!({"user": {"name": "Ada"}}));
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// subject.subscribe("user/name", move |v: Option<Value>| sink.borrow_mut().push(v));
///
/// let root = subject.get_value();
/// let user = root.as_object().and_then(|root| root.object("user")).unwrap();
/// user.set("name", "Grace");
///
/// assert_eq!(seen.borrow().len(), 2);
/// assert_eq!(seen.borrow()[1], Some(Value::from("Grace")));
/// ```
#[derive(Clone)]
pub struct DeepSubject {
    state: Rc<DeepState>,
}

impl DeepSubject {
    #[must_use]
    pub fn new(initial: impl Into<Value>) -> Self {
        Self::with_options(initial, DeepSubjectOptions::default())
    }

    #[must_use]
    pub fn with_options(initial: impl Into<Value>, options: DeepSubjectOptions) -> Self {
        let root = initial.into();
        let mut cache = WrapperCache::default();
        cache.observe(&root, "");
        Self {
            state: Rc::new(DeepState {
                root: RefCell::new(root),
                cache: RefCell::new(cache),
                registry: RefCell::new(PathRegistry::default()),
                next_id: Cell::new(SubscriptionId::FIRST),
                before: RefCell::new(None),
                debug: RefCell::new(DebugHook::Off),
                options,
            }),
        }
    }

    /// Listen to `pattern`, then receive the current value at it right away.
    ///
    /// `**` receives the root. Other patterns receive the value at the literal
    /// pattern path, `None` when it does not resolve.
    pub fn subscribe(&self, pattern: impl Into<String>, subscriber: impl Fn(Option<Value>) + 'static) -> DeepSubscription {
        let pattern = pattern.into();
        let handler: Handler = Rc::new(subscriber);
        let mut next_id = self.state.next_id.get();
        let id = next_id.bump();
        self.state.next_id.set(next_id);
        self.state
            .registry
            .borrow_mut()
            .insert(&pattern, id, Rc::clone(&handler));

        let current = if pattern == path::ANY_DEPTH {
            Some(self.value())
        } else {
            self.state.value_at(&pattern)
        };
        deliver(&self.state.options.name, id, || handler(current));

        DeepSubscription {
            pattern,
            id,
            state: Rc::downgrade(&self.state),
        }
    }

    /// The observed root. Mutations through it notify subscribers.
    #[must_use]
    pub fn get_value(&self) -> Observed {
        Observed::wrap(&Rc::downgrade(&self.state), self.value(), "")
    }

    /// Raw root handle. Mutating containers through it bypasses notification.
    #[must_use]
    pub fn value(&self) -> Value {
        self.state.root.borrow().clone()
    }

    #[must_use]
    pub fn value_at(&self, at: &str) -> Option<Value> {
        self.state.value_at(at)
    }

    /// Replace the whole tree.
    ///
    /// Each registered pattern is resolved as a literal path in the new tree
    /// and its subscribers are notified when it resolves; `**` resolves to
    /// the root. Wildcard segments are not expanded here.
    pub fn next(&self, next: impl Into<Value>) {
        let next = next.into();
        if !self.state.options.update_if_strictly_equal && self.state.root.borrow().strict_eq(&next) {
            tracing::trace!(message = "deep.next.skipped", subject = %self.state.options.name);
            return;
        }
        let incoming = self.state.debug.borrow().is_enabled().then(|| next.clone());

        let before = self.state.before.borrow().clone();
        let value = match before {
            Some(before) => before(next),
            None => next,
        };

        {
            let mut cache = self.state.cache.borrow_mut();
            cache.clear();
            cache.observe(&value, "");
        }
        *self.state.root.borrow_mut() = value;

        let patterns = self.state.registry.borrow().patterns();
        for pattern in patterns {
            let current = if pattern == path::ANY_DEPTH {
                Some(self.value())
            } else {
                self.state.value_at(&pattern)
            };
            if current.is_none() {
                continue;
            }
            let subscribers = self.state.registry.borrow().snapshot(&pattern);
            self.state.deliver_all(&pattern, subscribers, &current);
        }

        if let Some(incoming) = incoming {
            self.run_debug(&incoming);
        }
    }

    fn run_debug(&self, incoming: &Value) {
        let hook = self.state.debug.borrow().clone();
        match hook {
            DebugHook::Off => {}
            DebugHook::Trace => {
                let registry = self.state.registry.borrow();
                tracing::debug!(
                    message = "deep.next",
                    subject = %self.state.options.name,
                    next = ?incoming,
                    patterns = registry.patterns().len(),
                    subscribers = registry.len(),
                );
            }
            DebugHook::Custom(hook) => hook(incoming),
        }
    }

    /// Transform every value passed to [`next`](Self::next) before storage.
    pub fn set_before(&self, before: impl Fn(Value) -> Value + 'static) {
        *self.state.before.borrow_mut() = Some(Rc::new(before));
    }

    pub fn clear_before(&self) {
        *self.state.before.borrow_mut() = None;
    }

    pub fn set_debug(&self, enabled: bool) {
        *self.state.debug.borrow_mut() = DebugHook::from(enabled);
    }

    /// Call `hook` with each incoming value after subscribers were notified.
    pub fn set_debug_hook(&self, hook: impl Fn(&Value) + 'static) {
        *self.state.debug.borrow_mut() = DebugHook::Custom(Rc::new(hook));
    }

    /// Subscribers across all patterns.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.registry.borrow().len()
    }

    /// Registered patterns in registration order.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        self.state.registry.borrow().patterns()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.options.name
    }

    #[must_use]
    pub fn options(&self) -> &DeepSubjectOptions {
        &self.state.options
    }

    /// Containers currently tagged with a path.
    #[must_use]
    pub fn observed_len(&self) -> usize {
        self.state.cache.borrow().live_len()
    }
}

impl fmt::Debug for DeepSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSubject")
            .field("name", &self.state.options.name)
            .field("patterns", &self.patterns())
            .field("value", &*self.state.root.borrow())
            .finish()
    }
}

/// Handle returned by [`DeepSubject::subscribe`].
///
/// Dropping it does not unsubscribe.
#[derive(Clone)]
pub struct DeepSubscription {
    pattern: String,
    id: SubscriptionId,
    state: Weak<DeepState>,
}

impl DeepSubscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Remove this subscriber; `true` only for the call that removed it.
    pub fn unsubscribe(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let removed = state.registry.borrow_mut().remove(&self.pattern, self.id);
        if removed && state.debug.borrow().is_enabled() {
            tracing::debug!(
                message = "deep.unsubscribe",
                subject = %state.options.name,
                pattern = %self.pattern,
                subscribers = state.registry.borrow().len(),
            );
        }
        removed
    }
}

impl fmt::Debug for DeepSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSubscription")
            .field("pattern", &self.pattern)
            .field("id", &self.id)
            .finish()
    }
}

#![forbid(unsafe_code)]

//! Flat single-value subject.
//!
//! [`Subject<T>`] is a cheap-to-clone handle over shared state
//! (`Rc<RefCell<..>>`); clones observe and mutate the same value.
//!
//! # Invariants
//!
//! 1. `count` starts at 1 and increments exactly once per accepted `next`.
//! 2. `before` runs exactly once per accepted `next`, before storage.
//! 3. Subscribers are notified in ascending [`SubscriptionId`] order, which is
//!    registration order.
//! 4. No `RefCell` borrow is held while a subscriber, `before`, or the debug
//!    hook runs, so any of them may re-enter the subject.
//! 5. A subscriber removed during a notification cycle is not called for the
//!    rest of that cycle.
//!
//! # Failure Modes
//!
//! - **Subscriber panics**: caught, logged at `ERROR`, delivery continues.
//! - **Shape mismatch** (`next_assign` on a non-object, `next_push` on a
//!   non-array): returned as [`SubjectError`](crate::SubjectError); the value
//!   is untouched.
//! - **Subscriber limit reached**: the subscription is rejected with an inert
//!   handle and a `WARN` event.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::capability::{Appendable, Mergeable, StrictEq, Toggleable};
use crate::debug::DebugHook;
use crate::error::Result;
use crate::options::SubjectOptions;
use crate::subscription::{Detach, Subscription, SubscriptionId, deliver};

type Callback<T> = Rc<dyn Fn(&T)>;
type Transform<T> = Rc<dyn Fn(T) -> T>;

struct SubjectState<T> {
    value: T,
    count: u64,
    next_id: SubscriptionId,
    subscribers: BTreeMap<SubscriptionId, Callback<T>>,
    before: Option<Transform<T>>,
    debug: DebugHook<T>,
    options: SubjectOptions,
}

/// A value that can be observed.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use subjecto::Subject;
///
/// let subject = Subject::new("a".to_string());
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let handle = subject.subscribe(move |v: &String| sink.borrow_mut().push(v.clone()));
///
/// subject.next("b".to_string());
/// handle.unsubscribe();
/// subject.next("c".to_string());
///
/// assert_eq!(*seen.borrow(), vec!["b".to_string()]);
/// assert_eq!(subject.count(), 3);
/// ```
pub struct Subject<T> {
    state: Rc<RefCell<SubjectState<T>>>,
}

/// Non-owning handle to a [`Subject`].
pub struct WeakSubject<T> {
    state: Weak<RefCell<SubjectState<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Clone for WeakSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<T> WeakSubject<T> {
    #[must_use]
    pub fn upgrade(&self) -> Option<Subject<T>> {
        self.state.upgrade().map(|state| Subject { state })
    }
}

impl<T: fmt::Debug> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Subject")
            .field("name", &state.options.name)
            .field("value", &state.value)
            .field("count", &state.count)
            .field("subscribers", &state.subscribers.len())
            .field("debug", &state.debug)
            .finish()
    }
}

impl<T> SubjectState<T> {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed && self.debug.is_enabled() {
            tracing::debug!(
                message = "subject.unsubscribe",
                subject = %self.options.name,
                subscription = id.get(),
                remaining = self.subscribers.len(),
            );
            if self.options.has_default_name() {
                tracing::info!(
                    message = "subject.unnamed",
                    hint = "set a custom name in the subject options for better debugging",
                );
            }
        }
        removed
    }
}

impl<T: 'static> Detach for RefCell<SubjectState<T>> {
    fn detach(&self, id: SubscriptionId) -> bool {
        self.borrow_mut().remove(id)
    }
}

impl<T: Clone + StrictEq + fmt::Debug + 'static> Subject<T> {
    /// Create a subject with default options.
    pub fn new(initial: T) -> Self {
        Self::with_options(initial, SubjectOptions::default())
    }

    pub fn with_options(initial: T, options: SubjectOptions) -> Self {
        Self {
            state: Rc::new(RefCell::new(SubjectState {
                value: initial,
                count: 1,
                next_id: SubscriptionId::FIRST,
                subscribers: BTreeMap::new(),
                before: None,
                debug: DebugHook::Off,
                options,
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.state.borrow().value.clone()
    }

    /// Alias of [`value`](Self::value).
    #[must_use]
    pub fn get_value(&self) -> T {
        self.value()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls `next` on this subject.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow().value)
    }

    /// Number of accepted updates, counting the initial value.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state.borrow().count
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.state.borrow().options.name.clone()
    }

    #[must_use]
    pub fn options(&self) -> SubjectOptions {
        self.state.borrow().options.clone()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakSubject<T> {
        WeakSubject {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Install the transform applied to every incoming value.
    pub fn set_before(&self, before: impl Fn(T) -> T + 'static) {
        self.state.borrow_mut().before = Some(Rc::new(before));
    }

    /// Restore the identity transform.
    pub fn clear_before(&self) {
        self.state.borrow_mut().before = None;
    }

    /// `true` emits a structured `DEBUG` event after each accepted `next`.
    pub fn set_debug(&self, enabled: bool) {
        self.state.borrow_mut().debug = DebugHook::from(enabled);
    }

    /// Call `hook` with each incoming value after subscribers were notified.
    pub fn set_debug_hook(&self, hook: impl Fn(&T) + 'static) {
        self.state.borrow_mut().debug = DebugHook::Custom(Rc::new(hook));
    }

    /// Replace the value and notify every subscriber.
    pub fn next(&self, next: T) {
        let (before, incoming) = {
            let state = self.state.borrow();
            if !state.options.update_if_strictly_equal && state.value.strict_eq(&next) {
                tracing::trace!(message = "subject.next.skipped", subject = %state.options.name);
                return;
            }
            let incoming = state.debug.is_enabled().then(|| next.clone());
            (state.before.clone(), incoming)
        };

        let value = match before {
            Some(before) => before(next),
            None => next,
        };

        let (name, subscribers) = {
            let mut state = self.state.borrow_mut();
            state.value = value.clone();
            state.count += 1;
            let subscribers: Vec<(SubscriptionId, Callback<T>)> = state
                .subscribers
                .iter()
                .map(|(id, callback)| (*id, Rc::clone(callback)))
                .collect();
            (state.options.name.clone(), subscribers)
        };

        for (id, callback) in subscribers {
            if !self.state.borrow().subscribers.contains_key(&id) {
                continue;
            }
            deliver(&name, id, || callback(&value));
        }

        if let Some(incoming) = incoming {
            self.run_debug(&incoming);
        }
    }

    fn run_debug(&self, incoming: &T) {
        let hook = self.state.borrow().debug.clone();
        match hook {
            DebugHook::Off => {}
            DebugHook::Trace => {
                let state = self.state.borrow();
                tracing::debug!(
                    message = "subject.next",
                    subject = %state.options.name,
                    next = ?incoming,
                    subscribers = state.subscribers.len(),
                    count = state.count,
                );
            }
            DebugHook::Custom(hook) => hook(incoming),
        }
    }

    /// Shallow-merge `patch` into the current object value, then `next`.
    ///
    /// # Errors
    ///
    /// [`SubjectError::ValueNotObject`](crate::SubjectError::ValueNotObject)
    /// when the current value is not an object.
    pub fn next_assign(&self, patch: T::Patch) -> Result<()>
    where
        T: Mergeable,
    {
        let merged = self.with(|value| value.merged(patch))?;
        self.next(merged);
        Ok(())
    }

    /// Append `item` to the current sequence value, then `next`.
    ///
    /// # Errors
    ///
    /// [`SubjectError::ValueNotArray`](crate::SubjectError::ValueNotArray)
    /// when the current value is not a sequence.
    pub fn next_push(&self, item: T::Item) -> Result<()>
    where
        T: Appendable,
    {
        let appended = self.with(|value| value.appended(item))?;
        self.next(appended);
        Ok(())
    }

    /// Flip a boolean value. Non-boolean values are left alone.
    pub fn toggle(&self)
    where
        T: Toggleable,
    {
        if let Some(flipped) = self.with(T::toggled) {
            self.next(flipped);
        }
    }

    /// Register `subscriber`; it is called on every subsequent `next`.
    ///
    /// When `max_subscribers` is reached the subscription is rejected: the
    /// returned handle is inert and a `WARN` event is emitted. A limit of
    /// zero means no limit.
    pub fn subscribe(&self, subscriber: impl Fn(&T) + 'static) -> Subscription {
        let mut state = self.state.borrow_mut();
        if let Some(max) = state.options.max_subscribers
            && max > 0
            && state.subscribers.len() >= max
        {
            tracing::warn!(
                message = "subject.max_subscribers",
                subject = %state.options.name,
                max_subscribers = max,
                reason = "subscription rejected",
            );
            return Subscription::inert();
        }

        let id = state.next_id.bump();
        state.subscribers.insert(id, Rc::new(subscriber));
        drop(state);

        let source: Weak<dyn Detach> = Rc::downgrade(&self.state) as Weak<dyn Detach>;
        Subscription::new(id, source)
    }

    /// Remove a subscriber by id. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.borrow_mut().remove(id)
    }

    /// Subscribe for exactly one delivery.
    pub fn once(&self, subscriber: impl Fn(&T) + 'static) -> Subscription {
        let fired = Rc::new(Cell::new(false));
        let slot: Rc<Cell<SubscriptionId>> = Rc::new(Cell::new(SubscriptionId::INERT));
        let weak = Rc::downgrade(&self.state);

        let handle = {
            let slot = Rc::clone(&slot);
            self.subscribe(move |value| {
                if fired.replace(true) {
                    return;
                }
                if let Some(state) = weak.upgrade() {
                    state.borrow_mut().remove(slot.get());
                }
                subscriber(value);
            })
        };
        slot.set(handle.id());
        handle
    }

    /// Drop every subscriber.
    pub fn complete(&self) {
        let ids: Vec<SubscriptionId> = self.state.borrow().subscribers.keys().copied().collect();
        let mut state = self.state.borrow_mut();
        for id in ids {
            state.remove(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

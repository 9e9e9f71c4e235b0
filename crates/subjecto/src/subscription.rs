//! Subscription identity and handles shared by both subject kinds.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Weak;

/// Identifier of a registered subscriber.
///
/// Drawn from a per-subject counter, so ids are unique within a subject and
/// strictly increase in registration order. `0` is reserved for inert
/// handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Id carried by handles of rejected subscriptions.
    pub const INERT: Self = Self(0);

    pub(crate) const FIRST: Self = Self(1);

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn bump(&mut self) -> Self {
        let current = *self;
        self.0 += 1;
        current
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something a subscription can be removed from.
pub(crate) trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
}

/// Handle returned by [`Subject::subscribe`](crate::Subject::subscribe).
///
/// Holds only a weak reference to the subject. Dropping the handle does not
/// unsubscribe; call [`unsubscribe`](Self::unsubscribe) (idempotent).
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    source: Option<Weak<dyn Detach>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, source: Weak<dyn Detach>) -> Self {
        Self {
            id,
            source: Some(source),
        }
    }

    /// A handle that is attached to nothing.
    pub(crate) fn inert() -> Self {
        Self {
            id: SubscriptionId::INERT,
            source: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether this handle came from a rejected subscription.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.source.is_none()
    }

    /// Remove the subscriber. Returns `true` only for the call that actually
    /// removed it.
    pub fn unsubscribe(&self) -> bool {
        self.source
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|source| source.detach(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("inert", &self.is_inert())
            .finish()
    }
}

/// Run one subscriber callback, isolating panics.
///
/// A panicking subscriber is logged and reported as `false`; the caller keeps
/// delivering to the remaining subscribers.
pub(crate) fn deliver(subject: &str, id: SubscriptionId, callback: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!(
                message = "subject.subscriber_panic",
                subject,
                subscription = id.get(),
                reason = panic_reason(payload.as_ref()),
            );
            false
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

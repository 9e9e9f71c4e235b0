//! Pattern-keyed subscriber registry.
//!
//! Patterns are kept in registration order; a pattern whose last subscriber
//! leaves is pruned. Delivery never runs while the registry is borrowed:
//! callers take a [`Delivery`] plan (an owned snapshot) and re-check
//! [`PathRegistry::contains`] before each callback.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::path;
use crate::subscription::SubscriptionId;
use crate::value::Value;

pub(crate) type Handler = Rc<dyn Fn(Option<Value>)>;

/// Where a delivery reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// The mutated path itself; delivered even when it no longer resolves.
    Exact(String),
    /// The whole root.
    Root,
    /// Another path; skipped when it does not resolve.
    At(String),
}

/// Subscribers of one pattern and the value they should receive.
pub(crate) struct Delivery {
    pub(crate) pattern: String,
    pub(crate) target: Target,
    pub(crate) subscribers: Vec<(SubscriptionId, Handler)>,
}

#[derive(Default)]
pub(crate) struct PathRegistry {
    patterns: IndexMap<String, IndexMap<SubscriptionId, Handler>>,
}

impl PathRegistry {
    pub(crate) fn insert(&mut self, pattern: &str, id: SubscriptionId, handler: Handler) {
        self.patterns
            .entry(pattern.to_owned())
            .or_default()
            .insert(id, handler);
    }

    /// Remove one subscriber, pruning its pattern when it was the last one.
    pub(crate) fn remove(&mut self, pattern: &str, id: SubscriptionId) -> bool {
        let Some(subscribers) = self.patterns.get_mut(pattern) else {
            return false;
        };
        let removed = subscribers.shift_remove(&id).is_some();
        if subscribers.is_empty() {
            self.patterns.shift_remove(pattern);
        }
        removed
    }

    pub(crate) fn contains(&self, pattern: &str, id: SubscriptionId) -> bool {
        self.patterns
            .get(pattern)
            .is_some_and(|subscribers| subscribers.contains_key(&id))
    }

    /// Total number of subscribers across all patterns.
    pub(crate) fn len(&self) -> usize {
        self.patterns.values().map(IndexMap::len).sum()
    }

    pub(crate) fn patterns(&self) -> Vec<String> {
        self.patterns.keys().cloned().collect()
    }

    pub(crate) fn snapshot(&self, pattern: &str) -> Vec<(SubscriptionId, Handler)> {
        self.patterns
            .get(pattern)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|(id, handler)| (*id, Rc::clone(handler)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Who hears about a mutation at `mutated`, in delivery order.
    ///
    /// Exact subscribers come first. Every other pattern follows in
    /// registration order: `**` receives the root, a matching pattern with a
    /// `*` segment receives the mutated value, a matching pattern with `**`
    /// receives the value at the path before its first `**`.
    pub(crate) fn plan(&self, mutated: &str) -> Vec<Delivery> {
        let mut plan = Vec::new();
        if let Some(subscribers) = self.patterns.get(mutated) {
            plan.push(Delivery {
                pattern: mutated.to_owned(),
                target: Target::Exact(mutated.to_owned()),
                subscribers: clone_handlers(subscribers),
            });
        }

        for (pattern, subscribers) in &self.patterns {
            if pattern == mutated {
                continue;
            }
            let target = if pattern == path::ANY_DEPTH {
                Target::Root
            } else if !path::matches(pattern, mutated) {
                continue;
            } else if path::has_any_segment(pattern) {
                Target::At(mutated.to_owned())
            } else if let Some(prefix) = path::any_depth_prefix(pattern) {
                Target::At(prefix)
            } else {
                continue;
            };
            plan.push(Delivery {
                pattern: pattern.clone(),
                target,
                subscribers: clone_handlers(subscribers),
            });
        }
        plan
    }
}

fn clone_handlers(subscribers: &IndexMap<SubscriptionId, Handler>) -> Vec<(SubscriptionId, Handler)> {
    subscribers
        .iter()
        .map(|(id, handler)| (*id, Rc::clone(handler)))
        .collect()
}

//! Identity-keyed wrapper cache.
//!
//! Maps a container (by [`ContainerKey`]) to the [`NodeTag`] every observed
//! handle for that container shares. The cache only holds weak references to
//! containers; entries whose container is gone are swept as the table grows.
//!
//! Whether a cached tag is still accurate depends on the tree, so that call is
//! left to the owner: see [`DeepState::tag`](super::DeepState::tag).

use std::rc::Rc;

use ahash::AHashMap;

use crate::value::{ContainerKey, Value, WeakContainer};

const MIN_SWEEP_THRESHOLD: usize = 64;

/// Path tag shared by all handles observing one container.
#[derive(Debug)]
pub(crate) struct NodeTag {
    pub(crate) path: String,
}

struct Entry {
    container: WeakContainer,
    tag: Rc<NodeTag>,
}

pub(crate) struct WrapperCache {
    entries: AHashMap<ContainerKey, Entry>,
    sweep_at: usize,
}

impl Default for WrapperCache {
    fn default() -> Self {
        Self {
            entries: AHashMap::new(),
            sweep_at: MIN_SWEEP_THRESHOLD,
        }
    }
}

impl WrapperCache {
    /// Tag for `value`, created with `path` on first sight.
    ///
    /// A container already in the cache keeps its tag. Scalars yield `None`.
    pub(crate) fn observe(&mut self, value: &Value, path: &str) -> Option<Rc<NodeTag>> {
        if let Some(tag) = value.container_key().and_then(|key| self.tag_of(key)) {
            return Some(tag);
        }
        self.retag(value, path)
    }

    /// Tag `value` with `path`, replacing any earlier tag.
    ///
    /// Handles created under the earlier tag keep it.
    pub(crate) fn retag(&mut self, value: &Value, path: &str) -> Option<Rc<NodeTag>> {
        let (key, container) = match value {
            Value::Object(object) => (object.key(), object.downgrade()),
            Value::Array(array) => (array.key(), array.downgrade()),
            _ => return None,
        };
        self.maybe_sweep();
        let tag = Rc::new(NodeTag {
            path: path.to_owned(),
        });
        self.entries.insert(
            key,
            Entry {
                container,
                tag: Rc::clone(&tag),
            },
        );
        Some(tag)
    }

    /// Existing tag for a container, if it was observed before.
    pub(crate) fn tag_of(&self, key: ContainerKey) -> Option<Rc<NodeTag>> {
        self.entries
            .get(&key)
            .filter(|entry| entry.container.is_alive())
            .map(|entry| Rc::clone(&entry.tag))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.sweep_at = MIN_SWEEP_THRESHOLD;
    }

    /// Number of entries whose container is still alive.
    pub(crate) fn live_len(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.container.is_alive())
            .count()
    }

    fn maybe_sweep(&mut self) {
        if self.entries.len() < self.sweep_at {
            return;
        }
        self.entries.retain(|_, entry| entry.container.is_alive());
        self.sweep_at = (self.entries.len() * 2).max(MIN_SWEEP_THRESHOLD);
    }
}

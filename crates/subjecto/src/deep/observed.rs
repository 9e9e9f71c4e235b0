//! Observed nodes: container handles that know their path.

use std::fmt;
use std::rc::{Rc, Weak};

use super::DeepState;
use super::cache::NodeTag;
use crate::path;
use crate::value::{Array, Object, Value};

/// Most `Null` slots [`ObservedArray::set`] adds to reach an index.
pub const MAX_PADDING: usize = 1 << 16;

/// A value read through a [`DeepSubject`](super::DeepSubject).
#[derive(Clone)]
pub enum Observed {
    Object(ObservedObject),
    Array(ObservedArray),
    Scalar(Value),
}

/// An object node. Writes notify subscribers of the written path.
#[derive(Clone)]
pub struct ObservedObject {
    object: Object,
    tag: Rc<NodeTag>,
    state: Weak<DeepState>,
}

/// An array node. Every mutating call notifies the array's own path.
#[derive(Clone)]
pub struct ObservedArray {
    array: Array,
    tag: Rc<NodeTag>,
    state: Weak<DeepState>,
}

/// Tag `value` as seen at `at`.
///
/// Without a live subject the tag is not cached.
fn tag_for(state: &Weak<DeepState>, value: &Value, at: &str) -> Option<Rc<NodeTag>> {
    match state.upgrade() {
        Some(state) => state.tag(value, at),
        None => value.is_container().then(|| Rc::new(NodeTag { path: at.to_owned() })),
    }
}

fn notify(state: &Weak<DeepState>, at: &str) {
    if let Some(state) = state.upgrade() {
        state.notify(at);
    }
}

impl Observed {
    pub(crate) fn wrap(state: &Weak<DeepState>, value: Value, at: &str) -> Self {
        let Some(tag) = tag_for(state, &value, at) else {
            return Self::Scalar(value);
        };
        let state = Weak::clone(state);
        match value {
            Value::Object(object) => Self::Object(ObservedObject { object, tag, state }),
            Value::Array(array) => Self::Array(ObservedArray { array, tag, state }),
            scalar => Self::Scalar(scalar),
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObservedObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ObservedArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The path the node was tagged with, `None` for scalars.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Object(object) => Some(object.path()),
            Self::Array(array) => Some(array.path()),
            Self::Scalar(_) => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Object(object) => object.to_value(),
            Self::Array(array) => array.to_value(),
            Self::Scalar(value) => value.clone(),
        }
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(object) => fmt::Debug::fmt(object, f),
            Self::Array(array) => fmt::Debug::fmt(array, f),
            Self::Scalar(value) => fmt::Debug::fmt(value, f),
        }
    }
}

// ---------------------------------------------------------------------------
// ObservedObject
// ---------------------------------------------------------------------------

impl ObservedObject {
    fn child_path(&self, key: &str) -> String {
        path::join(&self.tag.path, key)
    }

    /// Read a child; containers come back observed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Observed> {
        let value = self.object.get(key)?;
        Some(Observed::wrap(&self.state, value, &self.child_path(key)))
    }

    #[must_use]
    pub fn object(&self, key: &str) -> Option<ObservedObject> {
        match self.get(key)? {
            Observed::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn array(&self, key: &str) -> Option<ObservedArray> {
        match self.get(key)? {
            Observed::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.object.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.object.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.object.contains_key(key)
    }

    /// Write `key` and notify its path. Returns the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        let at = self.child_path(&key);
        tag_for(&self.state, &value, &at);
        let previous = self.object.insert(key, value);
        notify(&self.state, &at);
        previous
    }

    /// Delete `key`. Its path is notified only when the key existed.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.object.remove(key)?;
        notify(&self.state, &self.child_path(key));
        Some(removed)
    }

    /// Write every entry in order, one notification per entry.
    pub fn assign<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.tag.path
    }

    /// The underlying container. Writes through it are not observed.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.object.clone())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.object.ptr_eq(&other.object)
    }
}

impl fmt::Debug for ObservedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedObject")
            .field("path", &self.tag.path)
            .field("value", &self.object)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ObservedArray
// ---------------------------------------------------------------------------

impl ObservedArray {
    fn index_path(&self, index: usize) -> String {
        path::join(&self.tag.path, &index.to_string())
    }

    /// Tag incoming containers with the index they land at.
    fn adopt<'a>(&self, start: usize, items: impl IntoIterator<Item = &'a Value>) {
        for (offset, item) in items.into_iter().enumerate() {
            tag_for(&self.state, item, &self.index_path(start + offset));
        }
    }

    fn changed(&self) {
        notify(&self.state, &self.tag.path);
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Observed> {
        let value = self.array.get(index)?;
        Some(Observed::wrap(&self.state, value, &self.index_path(index)))
    }

    #[must_use]
    pub fn object(&self, index: usize) -> Option<ObservedObject> {
        match self.get(index)? {
            Observed::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn array(&self, index: usize) -> Option<ObservedArray> {
        match self.get(index)? {
            Observed::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Write slot `index`, padding with `Null` past the end.
    ///
    /// Notifies the index path, then the array path. A write that would pad
    /// more than [`MAX_PADDING`] slots is refused: nothing changes, nobody is
    /// notified and a `WARN` event is emitted.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Option<Value> {
        let len = self.array.len();
        if index.saturating_sub(len) > MAX_PADDING {
            tracing::warn!(
                message = "deep.array.padding_refused",
                path = %self.tag.path,
                index,
                len,
                max_padding = MAX_PADDING,
            );
            return None;
        }
        let value = value.into();
        let at = self.index_path(index);
        tag_for(&self.state, &value, &at);
        let previous = {
            let mut items = self.array.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
                items[index] = value;
                None
            } else {
                Some(std::mem::replace(&mut items[index], value))
            }
        };
        notify(&self.state, &at);
        self.changed();
        previous
    }

    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.adopt(self.array.len(), [&value]);
        self.array.push(value);
        self.changed();
    }

    pub fn pop(&self) -> Option<Value> {
        let popped = self.array.borrow_mut().pop();
        self.changed();
        popped
    }

    pub fn shift(&self) -> Option<Value> {
        let shifted = {
            let mut items = self.array.borrow_mut();
            (!items.is_empty()).then(|| items.remove(0))
        };
        self.changed();
        shifted
    }

    pub fn unshift(&self, value: impl Into<Value>) {
        let value = value.into();
        self.adopt(0, [&value]);
        self.array.borrow_mut().insert(0, value);
        self.changed();
    }

    /// Insert at `index`, clamped to the length.
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();
        let index = index.min(self.array.len());
        self.adopt(index, [&value]);
        self.array.borrow_mut().insert(index, value);
        self.changed();
    }

    /// Remove slot `index`; out of range removes nothing.
    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.array.borrow_mut();
            (index < items.len()).then(|| items.remove(index))
        };
        self.changed();
        removed
    }

    /// Remove `delete` items at `start` and insert `items` in their place.
    ///
    /// `start` and `delete` are clamped to the array. Returns the removed
    /// items.
    pub fn splice<I>(&self, start: usize, delete: usize, items: I) -> Vec<Value>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let len = self.array.len();
        let start = start.min(len);
        let end = start.saturating_add(delete).min(len);
        self.adopt(start, &items);
        let removed: Vec<Value> = self.array.borrow_mut().splice(start..end, items).collect();
        self.changed();
        removed
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.tag.path
    }

    /// The underlying container. Writes through it are not observed.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(self.array.clone())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.array.ptr_eq(&other.array)
    }
}

impl fmt::Debug for ObservedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedArray")
            .field("path", &self.tag.path)
            .field("value", &self.array)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::DeepSubject;
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_tag_children_with_joined_paths() {
        let subject = DeepSubject::new(json!({"user": {"tags": [{"id": 1}]}}));
        let root = subject.get_value();
        assert_eq!(root.path(), Some(""));
        let user = root.as_object().and_then(|r| r.object("user")).unwrap();
        assert_eq!(user.path(), "user");
        let tags = user.array("tags").unwrap();
        assert_eq!(tags.path(), "user/tags");
        assert_eq!(tags.object(0).unwrap().path(), "user/tags/0");
        assert!(tags.get(3).is_none());
        assert!(user.object("tags").is_none());
    }

    #[test]
    fn scalars_are_not_wrapped() {
        let subject = DeepSubject::new(json!({"n": 1}));
        let root = subject.get_value();
        let n = root.as_object().and_then(|r| r.get("n")).unwrap();
        assert_eq!(n.as_scalar(), Some(&Value::from(1)));
        assert_eq!(n.path(), None);
    }

    #[test]
    fn set_past_end_pads_with_null() {
        let subject = DeepSubject::new(json!({"list": [1]}));
        let list = subject.get_value().as_object().and_then(|r| r.array("list")).unwrap();
        assert_eq!(list.set(3, 4), None);
        assert_eq!(subject.value(), json!({"list": [1, null, null, 4]}));
        assert_eq!(list.set(0, 9), Some(Value::from(1)));
    }

    #[test]
    fn splice_clamps_and_returns_removed() {
        let subject = DeepSubject::new(json!([1, 2, 3, 4]));
        let items = subject.get_value().as_array().cloned().unwrap();
        let removed = items.splice(1, 2, ["a", "b", "c"]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(subject.value(), json!([1, "a", "b", "c", 4]));
        let removed = items.splice(10, 10, Vec::<Value>::new());
        assert!(removed.is_empty());
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn insert_and_remove_clamp() {
        let subject = DeepSubject::new(json!(["a"]));
        let items = subject.get_value().as_array().cloned().unwrap();
        items.insert(9, "z");
        items.insert(0, "0");
        assert_eq!(subject.value(), json!(["0", "a", "z"]));
        assert_eq!(items.remove(1), Some(Value::from("a")));
        assert_eq!(items.remove(7), None);
        assert_eq!(items.shift(), Some(Value::from("0")));
        assert_eq!(items.pop(), Some(Value::from("z")));
        assert_eq!(items.pop(), None);
        assert_eq!(items.shift(), None);
    }

    #[test]
    fn written_containers_take_the_written_path() {
        let subject = DeepSubject::new(json!({}));
        let root = subject.get_value().as_object().cloned().unwrap();
        root.set("profile", json!({"address": {"city": "Oslo"}}));
        let address = root.object("profile").and_then(|p| p.object("address")).unwrap();
        assert_eq!(address.path(), "profile/address");

        let list = Value::from(json!([]));
        root.set("list", list.clone());
        root.array("list").unwrap().push(json!({"x": 1}));
        let first = root.array("list").and_then(|l| l.object(0)).unwrap();
        assert_eq!(first.path(), "list/0");
    }

    #[test]
    fn far_out_of_range_index_is_refused() {
        let subject = DeepSubject::new(json!([1]));
        let hits = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&hits);
        subject.subscribe("**", move |_| counter.set(counter.get() + 1));
        let items = subject.get_value().as_array().cloned().unwrap();

        assert_eq!(items.set(usize::MAX, 2), None);
        assert_eq!(items.set(1 + MAX_PADDING + 1, 2), None);
        assert_eq!(items.len(), 1);
        assert_eq!(hits.get(), 1);

        items.set(1 + MAX_PADDING, 2);
        assert_eq!(items.len(), MAX_PADDING + 2);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn writes_after_subject_dropped_are_silent() {
        let subject = DeepSubject::new(json!({"a": {"b": 1}}));
        let a = subject.get_value().as_object().and_then(|r| r.object("a")).unwrap();
        let raw = subject.value();
        drop(subject);
        a.set("b", 2);
        a.set("c", json!({"d": 1}));
        assert_eq!(a.object("c").unwrap().path(), "a/c");
        assert_eq!(raw, json!({"a": {"b": 2, "c": {"d": 1}}}));
    }
}

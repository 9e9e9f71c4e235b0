#![forbid(unsafe_code)]

//! Dynamic value tree observed by a [`DeepSubject`](crate::DeepSubject).
//!
//! Scalars are stored inline. [`Object`] and [`Array`] are shared containers
//! (`Rc<RefCell<..>>`): cloning one clones the handle, so two values can
//! refer to the same container and a container can (directly or indirectly)
//! contain itself. Container identity is what the wrapper cache keys on.
//!
//! # Invariants
//!
//! 1. `Object` preserves key insertion order.
//! 2. [`ContainerKey`] is stable for the lifetime of a container and is never
//!    reused while any strong or weak handle to it exists.
//! 3. Equality, `Debug` and JSON conversion terminate on cyclic graphs.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{Result, SubjectError};

/// Identity of a shared container, derived from its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerKey(usize);

/// A node of the dynamic value tree.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Array),
    Object(Object),
}

/// Shared, ordered string-keyed map.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<IndexMap<String, Value>>>);

/// Shared sequence.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

/// Non-owning handle to a container.
#[derive(Clone)]
pub(crate) enum WeakContainer {
    Object(Weak<RefCell<IndexMap<String, Value>>>),
    Array(Weak<RefCell<Vec<Value>>>),
}

impl WeakContainer {
    pub(crate) fn is_alive(&self) -> bool {
        match self {
            Self::Object(weak) => weak.strong_count() > 0,
            Self::Array(weak) => weak.strong_count() > 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

impl Object {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(&self) -> ContainerKey {
        ContainerKey(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// Whether both handles point at the same container.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Clone of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Insert without any notification. Returns the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value.into())
    }

    /// Remove `key`, keeping the order of the remaining keys.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Borrow the entries.
    ///
    /// # Panics
    ///
    /// Panics if the container is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, IndexMap<String, Value>> {
        self.0.borrow()
    }

    /// Mutably borrow the entries. Writes made this way are not observed.
    pub fn borrow_mut(&self) -> RefMut<'_, IndexMap<String, Value>> {
        self.0.borrow_mut()
    }

    /// A new container holding a shallow copy of the entries.
    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        Self::from(self.0.borrow().clone())
    }

    pub(crate) fn downgrade(&self) -> WeakContainer {
        WeakContainer::Object(Rc::downgrade(&self.0))
    }
}

impl From<IndexMap<String, Value>> for Object {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self(Rc::new(RefCell::new(entries)))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<IndexMap<_, _>>(),
        )
    }
}

// ---------------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------------

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(&self) -> ContainerKey {
        ContainerKey(Rc::as_ptr(&self.0) as *const () as usize)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Clones of every element, in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Borrow the elements.
    ///
    /// # Panics
    ///
    /// Panics if the container is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    /// Mutably borrow the elements. Writes made this way are not observed.
    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }

    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        Self::from(self.to_vec())
    }

    pub(crate) fn downgrade(&self) -> WeakContainer {
        WeakContainer::Array(Rc::downgrade(&self.0))
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Index named by `segment`, if it is written the way an index prints.
fn array_index(segment: &str) -> Option<usize> {
    let digits = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
    if !digits || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    segment.parse().ok()
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is an object or array.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Identity of the container, `None` for scalars.
    #[must_use]
    pub fn container_key(&self) -> Option<ContainerKey> {
        match self {
            Self::Object(object) => Some(object.key()),
            Self::Array(array) => Some(array.key()),
            _ => None,
        }
    }

    /// Strict equality: containers compare by identity, scalars by value.
    #[must_use]
    pub fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(_) | Self::Array(_), _) | (_, Self::Object(_) | Self::Array(_)) => false,
            _ => self == other,
        }
    }

    /// Child reached by a single path segment.
    ///
    /// Objects are indexed by key, arrays by canonical decimal index (`"3"`,
    /// not `"03"` or `"+3"`) or `length`.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<Value> {
        match self {
            Self::Object(object) => object.get(segment),
            Self::Array(array) if segment == "length" => Some(Self::Number(array.len() as f64)),
            Self::Array(array) => array_index(segment).and_then(|i| array.get(i)),
            _ => None,
        }
    }

    /// Resolve a `/`-delimited path. The empty path is the value itself.
    #[must_use]
    pub fn pointer(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return Some(self.clone());
        }
        path.split(crate::path::SEPARATOR)
            .try_fold(self.clone(), |current, segment| current.child(segment))
    }

    /// Convert to `serde_json`, failing on cycles.
    ///
    /// Integral numbers become JSON integers; non-finite numbers become
    /// `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut stack = Vec::new();
        self.to_json_inner(&mut stack)
    }

    fn to_json_inner(&self, stack: &mut Vec<ContainerKey>) -> Result<serde_json::Value> {
        if let Some(key) = self.container_key() {
            if stack.contains(&key) {
                return Err(SubjectError::CircularValue);
            }
            stack.push(key);
        }
        let json = match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(array) => serde_json::Value::Array(
                array
                    .borrow()
                    .iter()
                    .map(|item| item.to_json_inner(stack))
                    .collect::<Result<_>>()?,
            ),
            Self::Object(object) => serde_json::Value::Object(
                object
                    .borrow()
                    .iter()
                    .map(|(k, v)| v.to_json_inner(stack).map(|json| (k.clone(), json)))
                    .collect::<Result<_>>()?,
            ),
        };
        if self.is_container() {
            stack.pop();
        }
        Ok(json)
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        if n >= 0.0 {
            serde_json::Value::from(n as u64)
        } else {
            serde_json::Value::from(n as i64)
        }
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

// ---------------------------------------------------------------------------
// Equality (structural, cycle-tolerant)
// ---------------------------------------------------------------------------

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut assumed = Vec::new();
        structural_eq(self, other, &mut assumed)
    }
}

/// Pairs already under comparison are assumed equal, which makes the
/// comparison terminate on cyclic graphs.
fn structural_eq(a: &Value, b: &Value, assumed: &mut Vec<(ContainerKey, ContainerKey)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if x.ptr_eq(y) || assumed.contains(&(x.key(), y.key())) {
                return true;
            }
            assumed.push((x.key(), y.key()));
            let (xs, ys) = (x.borrow(), y.borrow());
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(l, r)| structural_eq(l, r, assumed))
        }
        (Value::Object(x), Value::Object(y)) => {
            if x.ptr_eq(y) || assumed.contains(&(x.key(), y.key())) {
                return true;
            }
            assumed.push((x.key(), y.key()));
            let (xs, ys) = (x.borrow(), y.borrow());
            xs.len() == ys.len()
                && xs.iter().all(|(k, l)| {
                    ys.get(k)
                        .is_some_and(|r| structural_eq(l, r, assumed))
                })
        }
        _ => false,
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        self.to_json().is_ok_and(|json| json == *other)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Value::Object(self.clone()) == Value::Object(other.clone())
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        Value::Array(self.clone()) == Value::Array(other.clone())
    }
}

// ---------------------------------------------------------------------------
// Debug (JSON-like, cycles printed as `[Circular]`)
// ---------------------------------------------------------------------------

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_debug(self, f, &mut Vec::new())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_debug(&Value::Object(self.clone()), f, &mut Vec::new())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_debug(&Value::Array(self.clone()), f, &mut Vec::new())
    }
}

fn write_debug(
    value: &Value,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<ContainerKey>,
) -> fmt::Result {
    if let Some(key) = value.container_key() {
        if stack.contains(&key) {
            return f.write_str("[Circular]");
        }
        stack.push(key);
    }
    match value {
        Value::Null => f.write_str("null")?,
        Value::Bool(b) => write!(f, "{b}")?,
        Value::Number(n) => write!(f, "{n}")?,
        Value::String(s) => write!(f, "{s:?}")?,
        Value::Array(array) => {
            f.write_str("[")?;
            for (i, item) in array.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_debug(item, f, stack)?;
            }
            f.write_str("]")?;
        }
        Value::Object(object) => {
            f.write_str("{")?;
            for (i, (k, v)) in object.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{k:?}: ")?;
                write_debug(v, f, stack)?;
            }
            f.write_str("}")?;
        }
    }
    if value.is_container() {
        stack.pop();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Self::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(f64, f32, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Self::Array(array)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self::Object(Object::from(entries))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::Array(items.into_iter().collect()),
            serde_json::Value::Object(entries) => Self::Object(entries.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_keeps_integers() {
        let value = Value::from(json!({"a": 1, "b": [true, null, "x"], "c": -2, "d": 1.5}));
        assert_eq!(
            value.to_json().unwrap(),
            json!({"a": 1, "b": [true, null, "x"], "c": -2, "d": 1.5})
        );
    }

    #[test]
    fn clone_shares_container() {
        let object = Object::new();
        let alias = Value::Object(object.clone());
        object.insert("name", "John");
        assert_eq!(alias.child("name"), Some(Value::from("John")));
        assert!(alias.strict_eq(&Value::Object(object)));
    }

    #[test]
    fn strict_eq_is_identity_for_containers() {
        let a = Value::from(json!({"x": 1}));
        let b = Value::from(json!({"x": 1}));
        assert_eq!(a, b);
        assert!(!a.strict_eq(&b));
        assert!(a.strict_eq(&a.clone()));
        assert!(Value::from(3).strict_eq(&Value::from(3.0)));
    }

    #[test]
    fn pointer_resolves_objects_arrays_and_length() {
        let value = Value::from(json!({"user": {"tags": ["a", "b"]}}));
        assert_eq!(value.pointer("user/tags/1"), Some(Value::from("b")));
        assert_eq!(value.pointer("user/tags/length"), Some(Value::from(2)));
        assert_eq!(value.pointer("user/missing"), None);
        assert_eq!(value.pointer("user/tags/9"), None);
        assert!(value.pointer("").unwrap().strict_eq(&value));
    }

    #[test]
    fn only_canonical_indices_address_array_slots() {
        let value = Value::from(json!(["a", "b"]));
        assert_eq!(value.child("0"), Some(Value::from("a")));
        assert_eq!(value.child("1"), Some(Value::from("b")));
        for segment in ["01", "+1", "00", "-0", " 1", "1 ", "", "1.0"] {
            assert_eq!(value.child(segment), None, "segment {segment:?}");
        }
        assert_eq!(value.child("99999999999999999999999"), None);
    }

    #[test]
    fn cycles_are_handled() {
        let object = Object::new();
        object.insert("name", "loop");
        object.insert("me", object.clone());
        let value = Value::Object(object.clone());

        assert_eq!(value.to_json(), Err(SubjectError::CircularValue));
        assert_eq!(format!("{value:?}"), r#"{"name": "loop", "me": [Circular]}"#);

        let other = Object::new();
        other.insert("name", "loop");
        other.insert("me", other.clone());
        assert_eq!(value, Value::Object(other));
    }

    #[test]
    fn debug_is_json_like() {
        let value = Value::from(json!({"a": [1, 2.5], "b": null}));
        assert_eq!(format!("{value:?}"), r#"{"a": [1, 2.5], "b": null}"#);
    }

    #[test]
    fn remove_keeps_order() {
        let object: Object = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        object.remove("b");
        assert_eq!(object.keys(), vec!["a".to_owned(), "c".to_owned()]);
    }
}

//! Shape-dependent operations behind `next_assign`, `next_push` and `toggle`,
//! plus the equality used when `update_if_strictly_equal` is off.
//!
//! Each shape trait produces a *new* value from the current one; the subject
//! then feeds it through `next`. A failing call never touches the current
//! value.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use indexmap::IndexMap;

use crate::error::{Result, SubjectError};
use crate::value::{Array, Object, Value};

/// Equality checked before a `next` when `update_if_strictly_equal` is off.
///
/// Plain data compares by value, which is the default. Shared containers
/// compare by identity, so a fresh container is never equal to the current
/// one even when it holds the same entries. Implement it with an empty body
/// for any `PartialEq` type:
///
/// ```
/// use subjecto::{StrictEq, Subject};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Point(i32, i32);
///
/// impl StrictEq for Point {}
///
/// let subject = Subject::new(Point(0, 0));
/// subject.next(Point(1, 2));
/// assert_eq!(subject.value(), Point(1, 2));
/// ```
pub trait StrictEq: PartialEq {
    fn strict_eq(&self, other: &Self) -> bool {
        self == other
    }
}

/// Values that accept a shallow merge of a partial object.
pub trait Mergeable: Sized {
    type Patch;

    /// `self` with every entry of `patch` written over it.
    ///
    /// # Errors
    ///
    /// [`SubjectError::ValueNotObject`] when `self` is not an object.
    fn merged(&self, patch: Self::Patch) -> Result<Self>;
}

/// Sequence values that accept an appended item.
pub trait Appendable: Sized {
    type Item;

    /// # Errors
    ///
    /// [`SubjectError::ValueNotArray`] when `self` is not a sequence.
    fn appended(&self, item: Self::Item) -> Result<Self>;
}

/// Values that may be boolean.
pub trait Toggleable: Sized {
    /// The flipped value, or `None` when the current value is not boolean.
    fn toggled(&self) -> Option<Self>;
}

// ---------------------------------------------------------------------------
// StrictEq
// ---------------------------------------------------------------------------

macro_rules! strict_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(impl StrictEq for $ty {})*
    };
}

strict_eq_by_value!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &str, serde_json::Value,
);

impl<I: PartialEq> StrictEq for Vec<I> {}

impl<I: PartialEq> StrictEq for Option<I> {}

impl<K: Eq + Hash, V: PartialEq, S: BuildHasher> StrictEq for HashMap<K, V, S> {}

impl<K: PartialEq, V: PartialEq> StrictEq for BTreeMap<K, V> {}

impl<K: Eq + Hash, V: PartialEq, S: BuildHasher> StrictEq for IndexMap<K, V, S> {}

/// Containers by identity, scalars by value.
impl StrictEq for Value {
    fn strict_eq(&self, other: &Self) -> bool {
        Value::strict_eq(self, other)
    }
}

// ---------------------------------------------------------------------------
// serde_json::Value
// ---------------------------------------------------------------------------

impl Mergeable for serde_json::Value {
    type Patch = serde_json::Map<String, serde_json::Value>;

    fn merged(&self, patch: Self::Patch) -> Result<Self> {
        let serde_json::Value::Object(current) = self else {
            return Err(SubjectError::ValueNotObject);
        };
        let mut merged = current.clone();
        merged.extend(patch);
        Ok(serde_json::Value::Object(merged))
    }
}

impl Appendable for serde_json::Value {
    type Item = serde_json::Value;

    fn appended(&self, item: Self::Item) -> Result<Self> {
        let serde_json::Value::Array(current) = self else {
            return Err(SubjectError::ValueNotArray);
        };
        let mut items = current.clone();
        items.push(item);
        Ok(serde_json::Value::Array(items))
    }
}

impl Toggleable for serde_json::Value {
    fn toggled(&self) -> Option<Self> {
        self.as_bool().map(|b| serde_json::Value::Bool(!b))
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

impl Mergeable for Value {
    type Patch = IndexMap<String, Value>;

    /// The result is a new object; the current container is left untouched.
    fn merged(&self, patch: Self::Patch) -> Result<Self> {
        let Value::Object(current) = self else {
            return Err(SubjectError::ValueNotObject);
        };
        let merged: Object = current.shallow_copy();
        merged.borrow_mut().extend(patch);
        Ok(Value::Object(merged))
    }
}

impl Appendable for Value {
    type Item = Value;

    fn appended(&self, item: Self::Item) -> Result<Self> {
        let Value::Array(current) = self else {
            return Err(SubjectError::ValueNotArray);
        };
        let items: Array = current.shallow_copy();
        items.push(item);
        Ok(Value::Array(items))
    }
}

impl Toggleable for Value {
    fn toggled(&self) -> Option<Self> {
        self.as_bool().map(|b| Value::Bool(!b))
    }
}

// ---------------------------------------------------------------------------
// std and indexmap collections
// ---------------------------------------------------------------------------

impl<I: Clone> Appendable for Vec<I> {
    type Item = I;

    fn appended(&self, item: I) -> Result<Self> {
        let mut items = self.clone();
        items.push(item);
        Ok(items)
    }
}

impl<K, V, S> Mergeable for HashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    type Patch = Self;

    fn merged(&self, patch: Self) -> Result<Self> {
        let mut merged = self.clone();
        merged.extend(patch);
        Ok(merged)
    }
}

impl<K: Ord + Clone, V: Clone> Mergeable for BTreeMap<K, V> {
    type Patch = Self;

    fn merged(&self, patch: Self) -> Result<Self> {
        let mut merged = self.clone();
        merged.extend(patch);
        Ok(merged)
    }
}

impl<K, V, S> Mergeable for IndexMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    type Patch = Self;

    fn merged(&self, patch: Self) -> Result<Self> {
        let mut merged = self.clone();
        merged.extend(patch);
        Ok(merged)
    }
}

impl Toggleable for bool {
    fn toggled(&self) -> Option<Self> {
        Some(!self)
    }
}

// `None` plays the part of null: never an object, never an array.

impl<M: Mergeable> Mergeable for Option<M> {
    type Patch = M::Patch;

    fn merged(&self, patch: Self::Patch) -> Result<Self> {
        match self {
            Some(current) => current.merged(patch).map(Some),
            None => Err(SubjectError::ValueNotObject),
        }
    }
}

impl<A: Appendable> Appendable for Option<A> {
    type Item = A::Item;

    fn appended(&self, item: Self::Item) -> Result<Self> {
        match self {
            Some(current) => current.appended(item).map(Some),
            None => Err(SubjectError::ValueNotArray),
        }
    }
}

impl<B: Toggleable> Toggleable for Option<B> {
    fn toggled(&self) -> Option<Self> {
        self.as_ref().and_then(Toggleable::toggled).map(Some)
    }
}

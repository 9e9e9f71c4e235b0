#![forbid(unsafe_code)]

//! Observable values: a flat [`Subject`] and a path-addressed [`DeepSubject`].
//!
//! Everything is single-threaded and synchronous. Subscribers run inline,
//! before the mutating call returns.

pub mod capability;
pub mod debug;
pub mod deep;
pub mod error;
pub mod options;
pub mod path;
pub mod subject;
pub mod subscription;
pub mod value;

pub use capability::{Appendable, Mergeable, StrictEq, Toggleable};
pub use debug::DebugHook;
pub use deep::{DeepSubject, DeepSubscription, Observed, ObservedArray, ObservedObject};
pub use error::{Result, SubjectError};
pub use options::{DEFAULT_NAME, DEFAULT_UPDATE_IF_STRICTLY_EQUAL, DeepSubjectOptions, SubjectOptions};
pub use subject::{Subject, WeakSubject};
pub use subscription::{Subscription, SubscriptionId};
pub use value::{Array, ContainerKey, Object, Value};

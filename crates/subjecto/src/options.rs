//! Construction options for [`Subject`](crate::Subject) and
//! [`DeepSubject`](crate::DeepSubject).
//!
//! Both option structs implement `Default` and expose builder-style setters.
//! With the `serde` feature enabled they also (de)serialize, with every field
//! optional in the serialized form.

/// Name used when none is configured.
pub const DEFAULT_NAME: &str = "noName";

/// By default every `next` call notifies, even when the value is unchanged.
pub const DEFAULT_UPDATE_IF_STRICTLY_EQUAL: bool = true;

/// Options for a flat [`Subject`](crate::Subject).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct SubjectOptions {
    /// Name shown in debug and inspection output.
    pub name: String,
    /// When `false`, `next` with a value equal to the current one is skipped.
    pub update_if_strictly_equal: bool,
    /// Upper bound on concurrently registered subscribers. `None` and
    /// `Some(0)` mean unlimited.
    pub max_subscribers: Option<usize>,
}

impl Default for SubjectOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            update_if_strictly_equal: DEFAULT_UPDATE_IF_STRICTLY_EQUAL,
            max_subscribers: None,
        }
    }
}

impl SubjectOptions {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn update_if_strictly_equal(mut self, update: bool) -> Self {
        self.update_if_strictly_equal = update;
        self
    }

    #[must_use]
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = Some(max);
        self
    }

    /// Whether the subject still carries [`DEFAULT_NAME`].
    #[must_use]
    pub fn has_default_name(&self) -> bool {
        self.name == DEFAULT_NAME
    }
}

/// Options for a [`DeepSubject`](crate::DeepSubject).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct DeepSubjectOptions {
    pub name: String,
    /// When `false`, `next` with the identical root (same container, or an
    /// equal scalar) is skipped.
    pub update_if_strictly_equal: bool,
}

impl Default for DeepSubjectOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            update_if_strictly_equal: DEFAULT_UPDATE_IF_STRICTLY_EQUAL,
        }
    }
}

impl DeepSubjectOptions {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn update_if_strictly_equal(mut self, update: bool) -> Self {
        self.update_if_strictly_equal = update;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SubjectOptions::default();
        assert_eq!(options.name, "noName");
        assert!(options.update_if_strictly_equal);
        assert_eq!(options.max_subscribers, None);
        assert!(options.has_default_name());

        let deep = DeepSubjectOptions::default();
        assert_eq!(deep.name, DEFAULT_NAME);
        assert!(deep.update_if_strictly_equal);
    }

    #[test]
    fn builder_setters() {
        let options = SubjectOptions::default()
            .name("counter")
            .update_if_strictly_equal(false)
            .max_subscribers(2);
        assert_eq!(options.name, "counter");
        assert!(!options.update_if_strictly_equal);
        assert_eq!(options.max_subscribers, Some(2));
        assert!(!options.has_default_name());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_partial_options() {
        let options: SubjectOptions =
            serde_json::from_str(r#"{"name":"store","maxSubscribers":3}"#).unwrap();
        assert_eq!(options.name, "store");
        assert!(options.update_if_strictly_equal);
        assert_eq!(options.max_subscribers, Some(3));

        let deep: DeepSubjectOptions =
            serde_json::from_str(r#"{"updateIfStrictlyEqual":false}"#).unwrap();
        assert_eq!(deep.name, DEFAULT_NAME);
        assert!(!deep.update_if_strictly_equal);
    }
}

use std::fmt;
use std::rc::Rc;

/// Debug hook run after every accepted `next`.
///
/// [`DebugHook::Trace`] emits a structured self-description through
/// `tracing`; [`DebugHook::Custom`] receives the incoming value (before the
/// `before` transform was applied).
pub enum DebugHook<T> {
    Off,
    Trace,
    Custom(Rc<dyn Fn(&T)>),
}

impl<T> DebugHook<T> {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

impl<T> Default for DebugHook<T> {
    fn default() -> Self {
        Self::Off
    }
}

impl<T> Clone for DebugHook<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Off => Self::Off,
            Self::Trace => Self::Trace,
            Self::Custom(hook) => Self::Custom(Rc::clone(hook)),
        }
    }
}

impl<T> From<bool> for DebugHook<T> {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Trace } else { Self::Off }
    }
}

impl<T> fmt::Debug for DebugHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("Off"),
            Self::Trace => f.write_str("Trace"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

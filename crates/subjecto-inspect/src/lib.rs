#![forbid(unsafe_code)]

//! Store inspection: log every update of the subjects in a store tree.
//!
//! A [`Store`] is a tree of named groups whose leaves are [`Inspectable`]
//! subjects. [`Inspector::inspect`] walks it once and attaches a logger to
//! each selected subject; every later update emits an `INFO` event
//! `inspect.update` carrying the dotted store path, seconds since the
//! previous logged update, subscriber count, update count and value.
//!
//! # Invariants
//!
//! 1. An inspector attaches at most once; later `inspect` calls are no-ops.
//! 2. The elapsed clock is shared by all subjects of one inspector and is
//!    reset after each logged update.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use subjecto::{StrictEq, Subject, Subscription};
use web_time::Instant;

/// Callback receiving the updated subject and its new value.
pub type UpdateHook = Rc<dyn Fn(&dyn Inspectable, &dyn fmt::Debug)>;

/// A subject an [`Inspector`] can follow.
pub trait Inspectable {
    /// Name from the subject options, used for key selection.
    fn name(&self) -> String;

    fn subscriber_count(&self) -> usize;

    fn update_count(&self) -> u64;

    /// Call `hook` after each update.
    fn attach(&self, hook: UpdateHook) -> Subscription;
}

impl<T> Inspectable for Subject<T>
where
    T: Clone + StrictEq + fmt::Debug + 'static,
{
    fn name(&self) -> String {
        Subject::name(self)
    }

    fn subscriber_count(&self) -> usize {
        Subject::subscriber_count(self)
    }

    fn update_count(&self) -> u64 {
        self.count()
    }

    fn attach(&self, hook: UpdateHook) -> Subscription {
        let weak = self.downgrade();
        self.subscribe(move |value: &T| {
            if let Some(subject) = weak.upgrade() {
                hook(&subject, value);
            }
        })
    }
}

/// A tree of subjects keyed by name.
pub enum Store {
    Subject(Rc<dyn Inspectable>),
    Group(IndexMap<String, Store>),
}

impl Store {
    pub fn subject(subject: impl Inspectable + 'static) -> Self {
        Self::Subject(Rc::new(subject))
    }

    pub fn group<K: Into<String>>(entries: impl IntoIterator<Item = (K, Store)>) -> Self {
        Self::Group(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject(subject) => write!(f, "Subject({})", subject.name()),
            Self::Group(entries) => f.debug_map().entries(entries.iter()).finish(),
        }
    }
}

/// Attaches update loggers to the subjects of a [`Store`].
pub struct Inspector {
    activated: bool,
    last_update: Rc<Cell<Instant>>,
    subscriptions: Vec<Subscription>,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            activated: false,
            last_update: Rc::new(Cell::new(Instant::now())),
            subscriptions: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Attach to every subject whose name is in `keys` (all subjects when
    /// `keys` is empty). Returns the number of subjects attached.
    ///
    /// Only the first call on an inspector does anything.
    pub fn inspect(&mut self, store: &Store, keys: &[&str]) -> usize {
        if self.activated {
            tracing::debug!(message = "inspect.already_active", attached = self.subscriptions.len());
            return 0;
        }
        self.activated = true;
        let before = self.subscriptions.len();
        self.walk(store, keys, "");
        self.subscriptions.len() - before
    }

    fn walk(&mut self, store: &Store, keys: &[&str], at: &str) {
        match store {
            Store::Subject(subject) => {
                let name = subject.name();
                if keys.is_empty() || keys.contains(&name.as_str()) {
                    let hook = self.logger(at.to_owned());
                    self.subscriptions.push(subject.attach(hook));
                }
            }
            Store::Group(entries) => {
                for (key, child) in entries {
                    self.walk(child, keys, &format!("{at}.{key}"));
                }
            }
        }
    }

    fn logger(&self, at: String) -> UpdateHook {
        let last_update = Rc::clone(&self.last_update);
        Rc::new(move |subject: &dyn Inspectable, value: &dyn fmt::Debug| {
            let elapsed = last_update.get().elapsed();
            tracing::info!(
                message = "inspect.update",
                path = %at,
                elapsed_s = elapsed.as_secs_f64(),
                subscribers = subject.subscriber_count(),
                count = subject.update_count(),
                value = ?value,
            );
            last_update.set(Instant::now());
        })
    }

    /// Remove every logger this inspector attached. The inspector stays
    /// activated.
    pub fn detach_all(&mut self) -> usize {
        self.subscriptions
            .drain(..)
            .filter(|subscription| subscription.unsubscribe())
            .count()
    }
}

impl fmt::Debug for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspector")
            .field("activated", &self.activated)
            .field("attached", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use subjecto::{DEFAULT_NAME, SubjectOptions};
    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_test::traced_test;

    type Fields = BTreeMap<String, String>;

    struct UpdateCapture {
        updates: Arc<Mutex<Vec<Fields>>>,
    }

    impl<S> Layer<S> for UpdateCapture
    where
        S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Visitor(Fields);
            impl tracing::field::Visit for Visitor {
                fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
                    self.0.insert(field.name().to_string(), format!("{value:?}"));
                }

                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    self.0.insert(field.name().to_string(), value.to_string());
                }
            }
            let mut visitor = Visitor(Fields::new());
            event.record(&mut visitor);
            if visitor.0.get("message").map(String::as_str) == Some("inspect.update") {
                self.updates.lock().expect("capture lock").push(visitor.0);
            }
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<Fields> {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(UpdateCapture {
            updates: Arc::clone(&updates),
        });
        tracing::subscriber::with_default(subscriber, f);
        updates.lock().expect("capture lock").clone()
    }

    fn named<T: Clone + StrictEq + fmt::Debug + 'static>(value: T, name: &str) -> Subject<T> {
        Subject::with_options(value, SubjectOptions::default().name(name))
    }

    #[test]
    fn flat_store_logs_each_update() {
        let name = named("initialName".to_string(), "actualNameKey");
        let age = Subject::new(30);
        let store = Store::group([
            ("nameSub", Store::subject(name.clone())),
            ("ageSub", Store::subject(age.clone())),
        ]);

        let updates = capture(|| {
            let mut inspector = Inspector::new();
            assert_eq!(inspector.inspect(&store, &[]), 2);
            name.next("newName".to_string());
            age.next(31);
        });

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0]["path"], ".nameSub");
        assert_eq!(updates[0]["subscribers"], "1");
        assert_eq!(updates[0]["count"], "2");
        assert_eq!(updates[0]["value"], "\"newName\"");
        assert_eq!(updates[1]["path"], ".ageSub");
        assert_eq!(updates[1]["value"], "31");
        assert!(updates[1]["elapsed_s"].parse::<f64>().is_ok_and(|s| s >= 0.0));
    }

    #[test]
    fn nested_groups_build_dotted_paths() {
        let user_name = named("initialName".to_string(), "userName");
        let settings = named(vec!["dark"], "userSettings");
        let store = Store::group([
            (
                "user",
                Store::group([("details", Store::group([("name", Store::subject(user_name.clone()))]))]),
            ),
            ("settings", Store::subject(settings.clone())),
        ]);

        let updates = capture(|| {
            Inspector::new().inspect(&store, &[]);
            user_name.next("newName".to_string());
            settings.next(vec!["light"]);
        });

        let paths: Vec<&str> = updates.iter().map(|u| u["path"].as_str()).collect();
        assert_eq!(paths, vec![".user.details.name", ".settings"]);
    }

    #[test]
    fn second_inspect_is_a_no_op() {
        let product = named("initialP", "prodName");
        let item = named("itemA", "itemSub");
        let mut inspector = Inspector::new();

        let updates = capture(|| {
            assert_eq!(inspector.inspect(&Store::group([("product", Store::subject(product.clone()))]), &[]), 1);
            assert_eq!(inspector.inspect(&Store::group([("item", Store::subject(item.clone()))]), &[]), 0);
            product.next("newP2");
            item.next("newItemB");
        });

        assert!(inspector.is_activated());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0]["path"], ".product");
        assert_eq!(item.subscriber_count(), 0);
    }

    #[test]
    fn keys_select_subjects_by_name() {
        let alpha = named("A", "alphaSubject");
        let beta = named("B", "betaSubject");
        let unnamed = Subject::new("U");
        let store = Store::group([
            ("alpha", Store::subject(alpha.clone())),
            ("beta", Store::subject(beta.clone())),
            ("unnamed", Store::subject(unnamed.clone())),
        ]);

        let updates = capture(|| {
            let attached = Inspector::new().inspect(&store, &["alphaSubject", DEFAULT_NAME]);
            assert_eq!(attached, 2);
            alpha.next("newA");
            beta.next("newB");
            unnamed.next("newU");
        });

        let paths: Vec<&str> = updates.iter().map(|u| u["path"].as_str()).collect();
        assert_eq!(paths, vec![".alpha", ".unnamed"]);
        assert_eq!(beta.subscriber_count(), 0);
    }

    #[test]
    fn detach_all_stops_logging() {
        let subject = named(0u8, "counter");
        let mut inspector = Inspector::new();
        inspector.inspect(&Store::group([("counter", Store::subject(subject.clone()))]), &[]);
        assert_eq!(subject.subscriber_count(), 1);
        assert_eq!(inspector.detach_all(), 1);
        assert_eq!(subject.subscriber_count(), 0);
        let updates = capture(|| subject.next(1));
        assert!(updates.is_empty());
        assert!(inspector.is_activated());
    }

    #[traced_test]
    #[test]
    fn update_event_is_info_level() {
        let subject = named(false, "flag");
        let mut inspector = Inspector::new();
        inspector.inspect(&Store::subject(subject.clone()), &["flag"]);
        subject.next(true);
        assert!(logs_contain("inspect.update"));
        assert!(logs_contain("INFO"));
        assert!(logs_contain("count=2"));
    }

    #[test]
    fn store_debug_lists_names() {
        let store = Store::group([("a", Store::subject(named(1, "one")))]);
        assert_eq!(format!("{store:?}"), "{\"a\": Subject(one)}");
    }
}

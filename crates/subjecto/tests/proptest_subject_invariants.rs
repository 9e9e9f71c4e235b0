//! Property-based invariant tests for the flat `Subject`.
//!
//! 1. `count` is one plus the number of accepted `next` calls.
//! 2. `before` runs exactly once per accepted `next`.
//! 3. With strict-equality updates disabled, equal values are skipped.
//! 4. Subscribers see every accepted value in order.
//! 5. Subscribe then unsubscribe leaves no subscribers.
//! 6. `once` fires at most once.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use subjecto::{Subject, SubjectOptions};

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Counting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn count_and_before_track_every_next(values in proptest::collection::vec(any::<i32>(), 0..32)) {
        let subject = Subject::new(0i32);
        let calls = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&calls);
        subject.set_before(move |v| {
            counter.set(counter.get() + 1);
            v
        });
        for v in &values {
            subject.next(*v);
        }
        prop_assert_eq!(subject.count(), 1 + values.len() as u64);
        prop_assert_eq!(calls.get(), values.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-4. Equality gating and delivery order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn equal_values_are_skipped_when_configured(values in proptest::collection::vec(0u8..4, 0..32)) {
        let options = SubjectOptions::default().update_if_strictly_equal(false);
        let subject = Subject::with_options(0u8, options);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        subject.subscribe(move |v: &u8| sink.borrow_mut().push(*v));

        let mut expected = Vec::new();
        let mut current = 0u8;
        for v in values {
            subject.next(v);
            if v != current {
                expected.push(v);
                current = v;
            }
        }
        prop_assert_eq!(subject.count(), 1 + expected.len() as u64);
        prop_assert_eq!(&*seen.borrow(), &expected);
        prop_assert_eq!(subject.value(), current);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Subscription bookkeeping
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unsubscribing_everyone_leaves_nothing(n in 0usize..16, order in any::<bool>()) {
        let subject = Subject::new(String::new());
        let mut handles: Vec<_> = (0..n).map(|_| subject.subscribe(|_| {})).collect();
        prop_assert_eq!(subject.subscriber_count(), n);
        if order {
            handles.reverse();
        }
        for handle in &handles {
            prop_assert!(handle.unsubscribe());
        }
        prop_assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn once_fires_at_most_once(nexts in 0usize..8) {
        let subject = Subject::new(0usize);
        let hits = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&hits);
        subject.once(move |_| counter.set(counter.get() + 1));
        for i in 0..nexts {
            subject.next(i);
        }
        prop_assert_eq!(hits.get(), nexts.min(1));
        prop_assert_eq!(subject.subscriber_count(), usize::from(nexts == 0));
    }
}

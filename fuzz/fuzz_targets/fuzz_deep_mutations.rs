#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use subjecto::{DeepSubject, Observed, Value};

const KEYS: [&str; 4] = ["a", "b", "c", "d"];
const PATTERNS: [&str; 6] = ["**", "a", "a/*", "a/**", "b/0", "*/*"];

#[derive(Arbitrary, Debug)]
enum Op {
    Descend(u8),
    Up,
    SetScalar(u8, i8),
    SetObject(u8),
    SetArray(u8),
    Remove(u8),
    Push(i8),
    Pop,
    Shift,
    Splice(u8, u8),
    Subscribe(u8),
    Unsubscribe,
    Replace,
}

fuzz_target!(|ops: Vec<Op>| {
    let subject = DeepSubject::new(root());
    let mut cursor: Vec<Observed> = vec![subject.get_value()];
    let mut handles = Vec::new();

    for op in ops.into_iter().take(256) {
        let Some(node) = cursor.last().cloned() else {
            break;
        };
        match (op, node) {
            (Op::Descend(k), Observed::Object(object)) => {
                if let Some(child) = object.get(KEYS[usize::from(k) % KEYS.len()]) {
                    cursor.push(child);
                }
            }
            (Op::Descend(i), Observed::Array(array)) => {
                if let Some(child) = array.get(usize::from(i) % 4) {
                    cursor.push(child);
                }
            }
            (Op::Up, _) => {
                if cursor.len() > 1 {
                    cursor.pop();
                }
            }
            (Op::SetScalar(k, v), Observed::Object(object)) => {
                object.set(KEYS[usize::from(k) % KEYS.len()], v);
            }
            (Op::SetScalar(i, v), Observed::Array(array)) => {
                array.set(usize::from(i) % 6, v);
            }
            (Op::SetObject(k), Observed::Object(object)) => {
                object.set(KEYS[usize::from(k) % KEYS.len()], subjecto::Object::new());
            }
            (Op::SetArray(k), Observed::Object(object)) => {
                object.set(KEYS[usize::from(k) % KEYS.len()], subjecto::Array::new());
            }
            (Op::Remove(k), Observed::Object(object)) => {
                object.remove(KEYS[usize::from(k) % KEYS.len()]);
            }
            (Op::Push(v), Observed::Array(array)) => array.push(v),
            (Op::Pop, Observed::Array(array)) => {
                array.pop();
            }
            (Op::Shift, Observed::Array(array)) => {
                array.shift();
            }
            (Op::Splice(start, delete), Observed::Array(array)) => {
                array.splice(usize::from(start % 8), usize::from(delete % 4), [Value::Null]);
            }
            (Op::Subscribe(p), _) => {
                handles.push(subject.subscribe(PATTERNS[usize::from(p) % PATTERNS.len()], |_| {}));
            }
            (Op::Unsubscribe, _) => {
                if let Some(handle) = handles.pop() {
                    assert!(handle.unsubscribe());
                }
            }
            (Op::Replace, _) => {
                subject.next(root());
                cursor.truncate(1);
                cursor[0] = subject.get_value();
            }
            _ => {}
        }
    }
    assert_eq!(subject.subscriber_count(), handles.len());
});

fn root() -> Value {
    let root = subjecto::Object::new();
    root.insert("a", subjecto::Object::new());
    root.insert("b", Value::from(vec![Value::from(1), Value::from(2)]));
    Value::Object(root)
}

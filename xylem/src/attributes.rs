//! Attribute comparison under an order policy.

use crate::node::Attributes;
use crate::options::AttributeOrder;

/// Whether two attribute sets are equivalent under `order`.
pub fn attributes_equivalent(a: &Attributes, b: &Attributes, order: AttributeOrder) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match order {
        AttributeOrder::Ignore => a.iter().all(|(k, v)| b.get(k) == Some(v)),
        AttributeOrder::Strict => a.iter().eq(b.iter()),
    }
}

/// Same keys and values, different key order.
pub fn order_differs(a: &Attributes, b: &Attributes) -> bool {
    attributes_equivalent(a, b, AttributeOrder::Ignore)
        && !attributes_equivalent(a, b, AttributeOrder::Strict)
}

/// `1 - differing / union` over attribute keys; a key differs when it is
/// missing on one side or carries another value.
pub fn attribute_similarity(a: &Attributes, b: &Attributes) -> f64 {
    let mut union = a.len();
    let mut differing = 0usize;

    for (key, value) in a {
        if b.get(key) != Some(value) {
            differing += 1;
        }
    }
    for key in b.keys() {
        if !a.contains_key(key) {
            union += 1;
            differing += 1;
        }
    }

    if union == 0 {
        1.0
    } else {
        1.0 - differing as f64 / union as f64
    }
}

/// Keys on `b` only, keys on `a` only, and shared keys whose value changed.
pub fn attribute_changes(a: &Attributes, b: &Attributes) -> (Vec<String>, Vec<String>, Vec<String>) {
    let added = b.keys().filter(|k| !a.contains_key(*k)).cloned().collect();
    let removed = a.keys().filter(|k| !b.contains_key(*k)).cloned().collect();
    let changed = a
        .iter()
        .filter(|(k, v)| b.get(*k).is_some_and(|bv| bv != *v))
        .map(|(k, _)| k.clone())
        .collect();
    (added, removed, changed)
}

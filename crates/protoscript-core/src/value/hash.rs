//! Structural hashing and equality for [`Value`] used as map keys.
//!
//! The runtime allows any value as a map key, including floats, so keys
//! cannot rely on `derive(Hash, Eq)` the way a statically-typed map would.
//! `PsMap` buckets entries by this content hash (grounded on the teacher's
//! `TypeHash`, an XXH64-based domain-separated hash) and falls back to
//! [`values_equal`] to resolve collisions, rather than requiring `Value`
//! itself to implement `Eq`.

use super::Value;
use ordered_float::OrderedFloat;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh64::Xxh64;

const SEED: u64 = 0x50_5343_5254; // "PSCRT" shifted into a u64 seed.

/// Structural equality between two dynamic values. Two values compare equal
/// only if they share a tag and their payloads compare equal; there is no
/// cross-type coercion (`Int(1)` is never equal to `Float(1.0)`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Void, Value::Void) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => OrderedFloat(*x) == OrderedFloat(*y),
        (Value::Byte(x), Value::Byte(y)) => x == y,
        (Value::Glyph(x), Value::Glyph(y)) => x == y,
        (Value::String(x), Value::String(y)) => x.as_str() == y.as_str(),
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::List(x), Value::List(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Map(x), Value::Map(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::View(x), Value::View(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Iter(x), Value::Iter(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::File(x), Value::File(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Exception(x), Value::Exception(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Group(x), Value::Group(y)) => x.same_member(y),
        _ => false,
    }
}

/// Content hash used to bucket a [`Value`] key in [`super::PsMap`].
/// Reference-counted kinds (lists, objects, ...) hash by identity, matching
/// `values_equal`'s use of `Rc::ptr_eq` for those tags.
pub fn hash_value(value: &Value) -> u64 {
    let mut hasher = Xxh64::new(SEED);
    match value {
        Value::Void => 0u8.hash(&mut hasher),
        Value::Bool(b) => {
            1u8.hash(&mut hasher);
            b.hash(&mut hasher);
        }
        Value::Int(i) => {
            2u8.hash(&mut hasher);
            i.hash(&mut hasher);
        }
        Value::Float(f) => {
            3u8.hash(&mut hasher);
            OrderedFloat(*f).hash(&mut hasher);
        }
        Value::Byte(b) => {
            4u8.hash(&mut hasher);
            b.hash(&mut hasher);
        }
        Value::Glyph(c) => {
            5u8.hash(&mut hasher);
            c.hash(&mut hasher);
        }
        Value::String(s) => {
            6u8.hash(&mut hasher);
            s.as_str().hash(&mut hasher);
        }
        Value::Bytes(b) => {
            7u8.hash(&mut hasher);
            b.hash(&mut hasher);
        }
        Value::List(l) => {
            8u8.hash(&mut hasher);
            (std::rc::Rc::as_ptr(l) as usize).hash(&mut hasher);
        }
        Value::Map(m) => {
            9u8.hash(&mut hasher);
            (std::rc::Rc::as_ptr(m) as usize).hash(&mut hasher);
        }
        Value::Object(o) => {
            10u8.hash(&mut hasher);
            (std::rc::Rc::as_ptr(o) as usize).hash(&mut hasher);
        }
        Value::View(v) => {
            11u8.hash(&mut hasher);
            (std::rc::Rc::as_ptr(v) as usize).hash(&mut hasher);
        }
        Value::Iter(i) => {
            12u8.hash(&mut hasher);
            (std::rc::Rc::as_ptr(i) as usize).hash(&mut hasher);
        }
        Value::File(f) => {
            13u8.hash(&mut hasher);
            (std::rc::Rc::as_ptr(f) as usize).hash(&mut hasher);
        }
        Value::Exception(e) => {
            14u8.hash(&mut hasher);
            (std::rc::Rc::as_ptr(e) as usize).hash(&mut hasher);
        }
        Value::Group(g) => {
            15u8.hash(&mut hasher);
            let (group_name, member_name) = g.hash_key();
            group_name.hash(&mut hasher);
            member_name.hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ints_hash_equal() {
        assert!(values_equal(&Value::Int(7), &Value::Int(7)));
        assert_eq!(hash_value(&Value::Int(7)), hash_value(&Value::Int(7)));
    }

    #[test]
    fn no_cross_type_equality() {
        assert!(!values_equal(&Value::Int(1), &Value::Float(1.0)));
    }

    #[test]
    fn string_equality_is_structural_not_identity() {
        let a = Value::String(std::rc::Rc::new(super::super::PsString::new("x")));
        let b = Value::String(std::rc::Rc::new(super::super::PsString::new("x")));
        assert!(values_equal(&a, &b));
    }
}

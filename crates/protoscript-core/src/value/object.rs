//! User-defined object instances: a field bag keyed by declared prototype.

use super::Value;
use crate::error::RuntimeError;
use rustc_hash::FxHashMap;

/// An instance of a declared `[MODULE]` prototype.
///
/// Fields are stored in declaration order (mirroring the original's
/// fixed-layout `PS_Object`) with an `FxHashMap` index for name lookup.
/// `proto_name` identifies which IR prototype this instance was
/// constructed from; prototype metadata itself (parent chain, field types,
/// methods) lives in the IR module, not on the instance.
#[derive(Debug)]
pub struct PsObject {
    proto_name: Box<str>,
    fields: Vec<(Box<str>, Value)>,
    index: FxHashMap<Box<str>, usize>,
}

impl PsObject {
    pub fn new(proto_name: impl Into<Box<str>>) -> Self {
        PsObject {
            proto_name: proto_name.into(),
            fields: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn proto_name(&self) -> &str {
        &self.proto_name
    }

    /// Leaked-lifetime-free `type_name` for [`Value::type_name`]; returns
    /// `"Object"` generically, since the concrete prototype name is only a
    /// `&str` borrowed from this instance and `type_name` must return
    /// `&'static str`. Callers that need the precise prototype should use
    /// [`PsObject::proto_name`] instead.
    pub fn type_name_static(&self) -> &'static str {
        "Object"
    }

    /// Declares a field slot with no value yet. Declared-but-uninitialized
    /// fields read as a type error until a `var_decl`/constructor sets them,
    /// matching the original runtime's "fields start uninitialized" rule.
    pub fn declare(&mut self, name: impl Into<Box<str>>) {
        let name = name.into();
        if self.index.contains_key(&name) {
            return;
        }
        let idx = self.fields.len();
        self.index.insert(name.clone(), idx);
        self.fields.push((name, Value::Void));
    }

    /// A field never declared on this prototype chain reads as an unbound
    /// [`Value::Void`] rather than erroring: "reading an absent object
    /// field returns an unbound value" per the runtime's field-access rule.
    pub fn get(&self, name: &str) -> Value {
        match self.index.get(name) {
            Some(&idx) => self.fields[idx].1.clone(),
            None => Value::Void,
        }
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| RuntimeError::TypeError(format!("no such field: {name}")))?;
        self.fields[idx].1 = value;
        Ok(())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_field_starts_void() {
        let mut obj = PsObject::new("Point");
        obj.declare("x");
        assert!(obj.get("x").is_void());
    }

    #[test]
    fn absent_field_reads_as_unbound_void() {
        let obj = PsObject::new("Point");
        assert!(obj.get("y").is_void());
    }

    #[test]
    fn set_unknown_field_errors() {
        let mut obj = PsObject::new("Point");
        assert!(obj.set("y", Value::Int(1)).is_err());
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut obj = PsObject::new("Point");
        obj.declare("x");
        obj.set("x", Value::Int(42)).unwrap();
        assert_eq!(obj.get("x").as_int(), Some(42));
    }
}

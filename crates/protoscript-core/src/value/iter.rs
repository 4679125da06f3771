//! Stateful iterators over lists, maps, strings and bytes buffers.

use super::{PsList, PsMap, PsString, PsView, Value};
use crate::error::RuntimeError;
use std::cell::RefCell;
use std::rc::Rc;

/// `for x of m` yields values; `for x in m` yields keys (spec §3/§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapIterMode {
    Of,
    In,
}

/// Which collection kind an [`PsIter`] walks.
pub enum IterMode {
    List(Rc<RefCell<PsList>>),
    /// Iterates values ("of") or keys ("in"), in insertion order.
    Map(Rc<RefCell<PsMap>>, MapIterMode),
    /// Iterates glyphs (Unicode scalar values), not bytes.
    StringGlyphs(Rc<PsString>),
    Bytes(Rc<[u8]>),
    /// Iterates a view's window, re-checking validity on every step (spec
    /// §4.3: "Iterators over views also check view validity").
    View(Rc<PsView>),
}

/// A stateful forward cursor. `index` is the position of the *next* item to
/// yield; `next()` returns `None` once `index` reaches the source length.
pub struct PsIter {
    pub mode: IterMode,
    pub index: usize,
}

impl PsIter {
    pub fn new(mode: IterMode) -> Self {
        PsIter { mode, index: 0 }
    }

    pub fn next(&mut self) -> Result<Option<Value>, RuntimeError> {
        let item = match &self.mode {
            IterMode::List(list) => {
                let list = list.borrow();
                list.as_slice().get(self.index).cloned()
            }
            IterMode::Map(map, MapIterMode::Of) => {
                let map = map.borrow();
                map.iter().nth(self.index).map(|(_, v)| v.clone())
            }
            IterMode::Map(map, MapIterMode::In) => {
                let map = map.borrow();
                map.keys().nth(self.index).cloned()
            }
            IterMode::StringGlyphs(s) => s.as_str().chars().nth(self.index).map(Value::Glyph),
            IterMode::Bytes(b) => b.get(self.index).map(|byte| Value::Byte(*byte)),
            IterMode::View(view) => {
                if !view.is_valid() {
                    return Err(RuntimeError::ViewInvalid);
                }
                if self.index >= view.len {
                    None
                } else {
                    Some(view.get(self.index as i64)?)
                }
            }
        };
        if item.is_some() {
            self.index += 1;
        }
        Ok(item)
    }

    /// Whether another element is available without consuming it. A view
    /// iterator reports invalidity as "no more elements" to the `has_next`
    /// check as well — the subsequent `next()` call surfaces the real
    /// `ViewInvalid` error at the point the interpreter's `branch_iter_
    /// has_next` instruction asks to advance anyway.
    pub fn has_next(&self) -> Result<bool, RuntimeError> {
        match &self.mode {
            IterMode::List(list) => Ok(self.index < list.borrow().len()),
            IterMode::Map(map, _) => Ok(self.index < map.borrow().len()),
            IterMode::StringGlyphs(s) => Ok(self.index < s.glyph_len()),
            IterMode::Bytes(b) => Ok(self.index < b.len()),
            IterMode::View(view) => {
                if !view.is_valid() {
                    return Err(RuntimeError::ViewInvalid);
                }
                Ok(self.index < view.len)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_iterator_yields_in_order_then_none() {
        let list = Rc::new(RefCell::new(PsList::from_vec(vec![
            Value::Int(1),
            Value::Int(2),
        ])));
        let mut it = PsIter::new(IterMode::List(list));
        assert_eq!(it.next().unwrap().unwrap().as_int(), Some(1));
        assert_eq!(it.next().unwrap().unwrap().as_int(), Some(2));
        assert!(it.next().unwrap().is_none());
    }

    #[test]
    fn string_glyph_iterator_counts_scalars() {
        let s = Rc::new(PsString::new("ab"));
        let mut it = PsIter::new(IterMode::StringGlyphs(s));
        assert!(matches!(it.next().unwrap(), Some(Value::Glyph('a'))));
        assert!(matches!(it.next().unwrap(), Some(Value::Glyph('b'))));
        assert!(it.next().unwrap().is_none());
    }

    #[test]
    fn map_of_mode_yields_values_in_mode_yields_keys() {
        let map = Rc::new(RefCell::new(PsMap::new()));
        map.borrow_mut().set(Value::String(Rc::new(PsString::new("a"))), Value::Int(1));
        map.borrow_mut().set(Value::String(Rc::new(PsString::new("b"))), Value::Int(2));

        let mut of_iter = PsIter::new(IterMode::Map(map.clone(), MapIterMode::Of));
        assert_eq!(of_iter.next().unwrap().unwrap().as_int(), Some(1));
        assert_eq!(of_iter.next().unwrap().unwrap().as_int(), Some(2));

        let mut in_iter = PsIter::new(IterMode::Map(map, MapIterMode::In));
        assert_eq!(in_iter.next().unwrap().unwrap().as_str(), Some("a"));
        assert_eq!(in_iter.next().unwrap().unwrap().as_str(), Some("b"));
    }
}

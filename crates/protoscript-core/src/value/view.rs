//! Read-only (or read-write) windows over a list, map, string or bytes
//! buffer, invalidated when the underlying source mutates.

use super::{PsList, PsString, Value};
use crate::error::RuntimeError;
use std::cell::RefCell;
use std::rc::Rc;

/// What a [`PsView`] is a window onto.
///
/// The `Borrowed` variant backs variadic-parameter binding: rather than
/// copying trailing call arguments into a list, the interpreter snapshots
/// them into an `Rc<[Value]>` and hands out a view over that snapshot. It
/// carries no live `version` to check against (snapshots never mutate), so
/// [`PsView::is_valid`] always returns `true` for it — see `DESIGN.md`'s
/// Open Question on variadic binding lifetimes.
pub enum ViewSource {
    List {
        source: Rc<RefCell<PsList>>,
        version_snapshot: u64,
    },
    /// Strings are immutable once constructed, so a view over one is always
    /// valid (spec §4.3: "a view is valid iff ... (b) source is a string").
    /// Indexing yields glyphs, not bytes.
    String(Rc<PsString>),
    Borrowed(Rc<[Value]>),
}

/// A view: an `(offset, len)` window over a [`ViewSource`], optionally
/// read-only.
pub struct PsView {
    pub source: ViewSource,
    pub offset: usize,
    pub len: usize,
    pub readonly: bool,
}

impl PsView {
    pub fn over_list(source: Rc<RefCell<PsList>>, offset: usize, len: usize, readonly: bool) -> Self {
        let version_snapshot = source.borrow().version();
        PsView {
            source: ViewSource::List {
                source,
                version_snapshot,
            },
            offset,
            len,
            readonly,
        }
    }

    pub fn over_string(source: Rc<PsString>, offset: usize, len: usize) -> Self {
        PsView {
            source: ViewSource::String(source),
            offset,
            len,
            readonly: true,
        }
    }

    pub fn over_borrowed(items: Rc<[Value]>) -> Self {
        let len = items.len();
        PsView {
            source: ViewSource::Borrowed(items),
            offset: 0,
            len,
            readonly: true,
        }
    }

    /// A view is valid as long as its source's live version still matches
    /// the version captured when the view was created.
    pub fn is_valid(&self) -> bool {
        match &self.source {
            ViewSource::List {
                source,
                version_snapshot,
            } => source.borrow().version() == *version_snapshot,
            ViewSource::String(_) => true,
            ViewSource::Borrowed(_) => true,
        }
    }

    pub fn get(&self, index: i64) -> Result<Value, RuntimeError> {
        if !self.is_valid() {
            return Err(RuntimeError::ViewInvalid);
        }
        let idx = self.resolve_index(index)?;
        match &self.source {
            ViewSource::List { source, .. } => {
                let list = source.borrow();
                Ok(list.as_slice()[self.offset + idx].clone())
            }
            ViewSource::String(s) => s
                .glyph_at(self.offset + idx)
                .map(Value::Glyph)
                .ok_or(RuntimeError::IndexOutOfBounds),
            ViewSource::Borrowed(items) => Ok(items[self.offset + idx].clone()),
        }
    }

    pub fn set(&self, index: i64, value: Value) -> Result<(), RuntimeError> {
        if self.readonly {
            return Err(RuntimeError::TypeError("view is read-only".into()));
        }
        if !self.is_valid() {
            return Err(RuntimeError::ViewInvalid);
        }
        let idx = self.resolve_index(index)?;
        match &self.source {
            ViewSource::List { source, .. } => {
                source.borrow_mut().set((self.offset + idx) as i64, value)
            }
            ViewSource::String(_) | ViewSource::Borrowed(_) => {
                Err(RuntimeError::TypeError("view is read-only".into()))
            }
        }
    }

    fn resolve_index(&self, index: i64) -> Result<usize, RuntimeError> {
        let len = self.len as i64;
        let real = if index < 0 { index + len } else { index };
        if real < 0 || real >= len {
            Err(RuntimeError::IndexOutOfBounds)
        } else {
            Ok(real as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_invalidates_after_source_mutation() {
        let list = Rc::new(RefCell::new(PsList::from_vec(vec![
            Value::Int(1),
            Value::Int(2),
        ])));
        let view = PsView::over_list(list.clone(), 0, 2, true);
        assert!(view.is_valid());
        list.borrow_mut().push(Value::Int(3));
        assert!(!view.is_valid());
        assert!(matches!(view.get(0), Err(RuntimeError::ViewInvalid)));
    }

    #[test]
    fn borrowed_view_stays_valid() {
        let items: Rc<[Value]> = Rc::from(vec![Value::Int(1), Value::Int(2)].into_boxed_slice());
        let view = PsView::over_borrowed(items);
        assert!(view.is_valid());
        assert_eq!(view.get(1).unwrap().as_int(), Some(2));
    }

    #[test]
    fn readonly_view_rejects_set() {
        let list = Rc::new(RefCell::new(PsList::from_vec(vec![Value::Int(1)])));
        let view = PsView::over_list(list, 0, 1, true);
        assert!(view.set(0, Value::Int(2)).is_err());
    }
}

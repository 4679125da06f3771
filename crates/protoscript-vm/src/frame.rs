//! Per-invocation state: named bindings and the active try-handler stack.

use protoscript_core::value::PsException;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

use protoscript_core::value::Value;

/// A single active `push_handler` entry.
pub struct TryFrame {
    pub handler_block: String,
}

/// The state of one in-flight function invocation.
///
/// Variables and temporaries share one namespace (`bindings`), matching the
/// IR's named (not slot-indexed) binding model described in the runtime's
/// interpreter design — there is no separate stack-slot allocator to keep in
/// sync with the IR producer's choices.
pub struct Frame {
    pub bindings: FxHashMap<String, Value>,
    pub tries: Vec<TryFrame>,
    /// The exception most recently bound by a handler via `get_exception`,
    /// available to a subsequent `rethrow`.
    pub current_exception: Option<Rc<RefCell<PsException>>>,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Frame {
    pub fn new(file: impl Into<String>) -> Self {
        Frame {
            bindings: FxHashMap::default(),
            tries: Vec::new(),
            current_exception: None,
            file: file.into(),
            line: 1,
            column: 1,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }
}

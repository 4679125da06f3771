//! `Context`: the per-thread runtime state threaded through every
//! interpreter call and every native function invocation.

use crate::error::RuntimeError;
use crate::value::{PsException, PsFile, PsObject, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Root-protection stack for native module code.
///
/// `Value`'s `Rc`-based refcounting already keeps a value alive for as long
/// as any Rust binding holds it, which covers the common case. The handle
/// stack exists for the less common one: a native function that builds a
/// `Value` and needs to keep it alive across further calls into the runtime
/// (which may trigger reentrant script execution) before it has anywhere
/// else to store it. Grounded on the original runtime's `ps_handle_push`/
/// `ps_handle_pop`.
#[derive(Default)]
pub struct HandleStack {
    items: Vec<Value>,
}

impl HandleStack {
    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-thread interpreter state.
///
/// One `Context` belongs to exactly one OS thread (spec's concurrency
/// model: no cross-thread sharing of a live interpreter); scripts
/// requiring parallelism spawn independent `Context`s, each with its own
/// loaded IR and native module set.
pub struct Context {
    handles: HandleStack,
    last_error: Option<RuntimeError>,
    pending_exception: Option<Rc<RefCell<PsException>>>,
    pub trace: bool,
    pub trace_ir: bool,
    stdin: Option<Value>,
    stdout: Option<Value>,
    stderr: Option<Value>,
    eof_sentinel: Option<Value>,
    /// Names of native modules currently resident in this context, kept
    /// here so `Module.symbol` resolution can report a useful "not loaded"
    /// diagnostic without the core depending on `protoscript-modules`
    /// (spec §4.6: "at most one resident copy of any module per context").
    loaded_modules: Vec<String>,
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            handles: HandleStack::default(),
            last_error: None,
            pending_exception: None,
            trace: false,
            trace_ir: false,
            stdin: None,
            stdout: None,
            stderr: None,
            eof_sentinel: None,
            loaded_modules: Vec::new(),
        }
    }

    /// The standard input stream, created on first use (spec §3 Context
    /// Lifecycle: "Standard I/O values are created lazily on first use").
    pub fn stdin_value(&mut self) -> Value {
        self.stdin
            .get_or_insert_with(|| Value::File(Rc::new(RefCell::new(PsFile::stdin()))))
            .clone()
    }

    pub fn stdout_value(&mut self) -> Value {
        self.stdout
            .get_or_insert_with(|| Value::File(Rc::new(RefCell::new(PsFile::stdout()))))
            .clone()
    }

    pub fn stderr_value(&mut self) -> Value {
        self.stderr
            .get_or_insert_with(|| Value::File(Rc::new(RefCell::new(PsFile::stderr()))))
            .clone()
    }

    /// The process-wide EOF sentinel: a singleton value compared by
    /// identity (`Rc::ptr_eq`), matching the original runtime's cached EOF
    /// marker (spec §3: "cached EOF sentinel"). Modeled as an empty
    /// `Object` with a reserved prototype name rather than a new `Value`
    /// tag, since spec.md's tag list has no dedicated "eof" kind — it is a
    /// distinguished *instance*, not a distinguished *type*.
    pub fn eof_sentinel(&mut self) -> Value {
        self.eof_sentinel
            .get_or_insert_with(|| Value::Object(Rc::new(RefCell::new(PsObject::new("Eof")))))
            .clone()
    }

    pub fn is_eof(&self, value: &Value) -> bool {
        match (self.eof_sentinel.as_ref(), value) {
            (Some(Value::Object(a)), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn note_module_loaded(&mut self, name: impl Into<String>) {
        self.loaded_modules.push(name.into());
    }

    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.loaded_modules.iter().any(|m| m == name)
    }

    pub fn handles_mut(&mut self) -> &mut HandleStack {
        &mut self.handles
    }

    pub fn set_last_error(&mut self, error: RuntimeError) {
        self.last_error = Some(error);
    }

    pub fn take_last_error(&mut self) -> Option<RuntimeError> {
        self.last_error.take()
    }

    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn set_pending_exception(&mut self, exc: Rc<RefCell<PsException>>) {
        self.pending_exception = Some(exc);
    }

    pub fn take_pending_exception(&mut self) -> Option<Rc<RefCell<PsException>>> {
        self.pending_exception.take()
    }

    pub fn has_pending_exception(&self) -> bool {
        self.pending_exception.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_stack_push_pop_is_lifo() {
        let mut ctx = Context::new();
        ctx.handles_mut().push(Value::Int(1));
        ctx.handles_mut().push(Value::Int(2));
        assert_eq!(ctx.handles_mut().pop().unwrap().as_int(), Some(2));
        assert_eq!(ctx.handles_mut().pop().unwrap().as_int(), Some(1));
        assert!(ctx.handles_mut().pop().is_none());
    }

    #[test]
    fn clear_error_drops_last_error() {
        let mut ctx = Context::new();
        ctx.set_last_error(RuntimeError::DivideByZero);
        assert!(ctx.last_error().is_some());
        ctx.clear_error();
        assert!(ctx.last_error().is_none());
    }
}

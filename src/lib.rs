//! The embeddable ProtoScript runtime facade: load a JSON IR module, run a
//! function in it against a fresh [`Context`], with native calls resolved
//! through a [`ModuleRegistry`].
//!
//! This crate is a thin wire-up over its four library crates
//! (`protoscript-core`, `protoscript-ir`, `protoscript-vm`,
//! `protoscript-modules`); it exists so an embedding host depends on one
//! package instead of four, the same shape the teacher's own root crate
//! gives `angelscript-core`/`-parser`/`-compiler`/etc.

pub use protoscript_core::context::Context;
pub use protoscript_core::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use protoscript_core::error::{ErrorCategory, ErrorCode, RuntimeError, ScriptResult};
pub use protoscript_core::value::{
    GroupScalar, PsException, PsFile, PsGroup, PsIter, PsList, PsMap, PsObject, PsString, PsView,
    Value,
};
pub use protoscript_ir::{load_from_str, load_from_value, LoadError, Module};
pub use protoscript_modules::prelude::{ModuleLoadError, ModuleRegistry};
pub use protoscript_vm::{Interpreter, NativeCallDispatch, NoNativeModules, Unwind};

use std::sync::Arc;

/// The two ways a run can conclude without the host having misused the API:
/// a plain return value, or an exception that escaped every `try` in the
/// program (spec §7's "unhandled exception" path).
#[derive(Debug)]
pub enum RunOutcome {
    Returned(Value),
    Unhandled(std::rc::Rc<std::cell::RefCell<PsException>>),
}

/// Loads `ir_json`, runs `function_name` with `args` against a fresh
/// [`Context`] and the given native-call dispatcher, and reports whether it
/// returned normally or raised an unhandled exception.
///
/// This is the single entry point an embedding host needs for the common
/// case: one module, one entry function, one context. Hosts that need
/// finer control (running several functions against the same `Context`, or
/// inspecting `Context::last_error` between calls) should drive
/// [`Interpreter`] directly instead. Pass [`NoNativeModules`] when the
/// program makes no `system_call`s, or a [`ModuleRegistry`] otherwise.
pub fn run_module(
    ir_json: &str,
    function_name: &str,
    args: Vec<Value>,
    dispatch: &mut dyn NativeCallDispatch,
) -> Result<RunOutcome, LoadError> {
    let module = load_from_str(ir_json)?;
    Ok(run_loaded_module(module, function_name, args, dispatch))
}

/// Like [`run_module`] but for a [`Module`] already loaded (e.g. shared
/// across several calls so the JSON is only parsed once).
pub fn run_loaded_module(
    module: Arc<Module>,
    function_name: &str,
    args: Vec<Value>,
    dispatch: &mut dyn NativeCallDispatch,
) -> RunOutcome {
    let interpreter = Interpreter::new(module);
    let mut ctx = Context::new();
    match interpreter.call_function(function_name, args, &mut ctx, dispatch) {
        Ok(value) => RunOutcome::Returned(value),
        Err(Unwind::Exception(exc)) => RunOutcome::Unhandled(exc),
    }
}

pub mod prelude {
    pub use crate::{run_loaded_module, run_module, RunOutcome};
    pub use protoscript_core::context::Context;
    pub use protoscript_core::value::Value;
    pub use protoscript_ir::Module;
    pub use protoscript_modules::prelude::ModuleRegistry;
    pub use protoscript_vm::{Interpreter, NoNativeModules};
}

//! The seam between the interpreter and native modules.
//!
//! `protoscript-vm` never links against `protoscript-modules` directly —
//! doing so would make the interpreter depend on dynamic loading, which a
//! host embedding the interpreter without any native modules shouldn't pay
//! for. Instead the host wires a `NativeCallDispatch` implementation (the
//! module registry lives in `protoscript-modules`) into the interpreter at
//! construction time, the same seam the teacher's `CallContext`/
//! `NativeCallable` pairing establishes between its VM core and host-bound
//! native functions.

use protoscript_core::context::Context;
use protoscript_core::error::RuntimeError;
use protoscript_core::value::Value;

/// Resolves and invokes a native (non-IR) function by `(module, function)`
/// name.
pub trait NativeCallDispatch {
    fn call(
        &mut self,
        module: &str,
        function: &str,
        args: &[Value],
        ctx: &mut Context,
    ) -> Result<Value, RuntimeError>;
}

/// A dispatcher with no registered modules; every call fails with a module
/// error. Useful for embedding contexts and for unit tests that never
/// exercise `system_call`.
#[derive(Default)]
pub struct NoNativeModules;

impl NativeCallDispatch for NoNativeModules {
    fn call(
        &mut self,
        module: &str,
        function: &str,
        _args: &[Value],
        _ctx: &mut Context,
    ) -> Result<Value, RuntimeError> {
        Err(RuntimeError::Module(format!(
            "no native module registry configured (tried {module}.{function})"
        )))
    }
}

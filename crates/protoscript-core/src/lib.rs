//! Runtime core for ProtoScript: the dynamic value model, reference-counted
//! collections, the interpreter-facing `Context`, and the error/diagnostic
//! vocabulary shared by the IR loader, the interpreter and native modules.

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod value;

pub mod prelude {
    pub use crate::context::Context;
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
    pub use crate::error::{ErrorCategory, ErrorCode, RuntimeError, ScriptResult};
    pub use crate::value::{
        GroupScalar, PsException, PsFile, PsGroup, PsIter, PsList, PsMap, PsObject, PsString,
        PsView, Value,
    };
}

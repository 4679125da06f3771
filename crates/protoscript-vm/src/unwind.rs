//! The propagation outcome of a failed function invocation.

use protoscript_core::value::PsException;
use std::cell::RefCell;
use std::rc::Rc;

/// What happened when a function invocation did not return normally.
///
/// This models the original runtime's "return 1, with `ctx->last_exception`
/// set" propagation path as an explicit `Err` variant rather than an
/// out-of-band context field, so a caller cannot forget to check it.
pub enum Unwind {
    /// An exception escaped every try-handler in the invocation and must be
    /// propagated to the caller (or, at the top level, reported as an
    /// unhandled exception).
    Exception(Rc<RefCell<PsException>>),
}

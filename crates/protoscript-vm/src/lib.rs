//! The interpreter: a tree-walking executor over `protoscript-ir` modules.
//!
//! The dispatch loop's shape — a per-call frame with named variable
//! bindings, a `block_idx`/`ip` cursor stepping through an instruction
//! array, and an explicit `match`-per-instruction-family dispatch — is
//! grounded on the teacher's own bytecode VM (`src/vm/vm.rs`'s
//! `execute_instruction`); the instruction semantics themselves (exception
//! unwinding via a try-handler stack, member access on exception values,
//! runtime-exception synthesis) are grounded on the original C runtime's
//! `exec_function`.

pub mod dispatch;
pub mod exception_support;
pub mod format;
pub mod frame;
pub mod interpreter;
pub mod ops;
pub mod unwind;

pub use dispatch::{NativeCallDispatch, NoNativeModules};
pub use interpreter::Interpreter;
pub use unwind::Unwind;

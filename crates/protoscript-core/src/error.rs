//! Error vocabulary for the ProtoScript runtime.
//!
//! `RuntimeError` is the single failure type produced anywhere inside
//! `protoscript-core`, `protoscript-ir` and `protoscript-vm`. It is
//! deliberately richer than a plain string: every variant knows how to
//! classify itself into the stable `(code, category)` pair that a host
//! embedding ProtoScript uses to build a `RuntimeException` value without
//! the interpreter needing to re-parse its own error messages.
//!
//! The classification rules mirror the original runtime's
//! `ps_runtime_category` dispatcher: some categories are determined purely
//! by which `RuntimeError` variant fired, while a handful (type errors that
//! are "really" JSON or I/O errors) additionally inspect the message text,
//! because the original error surface conflated several failure kinds behind
//! one `PS_ERR_TYPE`/`PS_ERR_INTERNAL` code.

use std::fmt;

/// Result alias used pervasively across the runtime crates, mirroring the
/// teacher's own `ScriptResult<T>` alias.
pub type ScriptResult<T> = Result<T, RuntimeError>;

/// The stable, host-visible error code attached to a `RuntimeException`.
///
/// These numbers are part of the external contract described by the
/// runtime's error handling design: a host embedding the interpreter may
/// match on `code` without caring which Rust variant produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    IntOverflow,
    IndexOutOfBounds,
    MissingKey,
    DivideByZero,
    ShiftRange,
    EmptyPop,
    InvalidUtf8,
    ByteRange,
    TypeError,
    IoError,
    ModuleError,
    JsonError,
    UnhandledException,
    ViewInvalid,
}

impl ErrorCode {
    /// The wire form used in diagnostics and exception `code` fields, e.g.
    /// `"R1001"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::IntOverflow => "R1001",
            ErrorCode::IndexOutOfBounds => "R1002",
            ErrorCode::MissingKey => "R1003",
            ErrorCode::DivideByZero => "R1004",
            ErrorCode::ShiftRange => "R1005",
            ErrorCode::EmptyPop => "R1006",
            ErrorCode::InvalidUtf8 => "R1007",
            ErrorCode::ByteRange => "R1008",
            ErrorCode::TypeError => "R1010",
            ErrorCode::IoError => "R1010",
            ErrorCode::ModuleError => "R1010",
            ErrorCode::JsonError => "R1010",
            ErrorCode::UnhandledException => "R1011",
            ErrorCode::ViewInvalid => "R1012",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The human-readable category name paired with an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    RuntimeIntOverflow,
    RuntimeIndexOob,
    RuntimeMissingKey,
    RuntimeDivideByZero,
    RuntimeShiftRange,
    RuntimeEmptyPop,
    RuntimeInvalidUtf8,
    RuntimeByteRange,
    RuntimeTypeError,
    RuntimeIoError,
    RuntimeModuleError,
    RuntimeJsonError,
    UnhandledException,
    RuntimeViewInvalid,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::RuntimeIntOverflow => "RUNTIME_INT_OVERFLOW",
            ErrorCategory::RuntimeIndexOob => "RUNTIME_INDEX_OOB",
            ErrorCategory::RuntimeMissingKey => "RUNTIME_MISSING_KEY",
            ErrorCategory::RuntimeDivideByZero => "RUNTIME_DIVIDE_BY_ZERO",
            ErrorCategory::RuntimeShiftRange => "RUNTIME_SHIFT_RANGE",
            ErrorCategory::RuntimeEmptyPop => "RUNTIME_EMPTY_POP",
            ErrorCategory::RuntimeInvalidUtf8 => "RUNTIME_INVALID_UTF8",
            ErrorCategory::RuntimeByteRange => "RUNTIME_BYTE_RANGE",
            ErrorCategory::RuntimeTypeError => "RUNTIME_TYPE_ERROR",
            ErrorCategory::RuntimeIoError => "RUNTIME_IO_ERROR",
            ErrorCategory::RuntimeModuleError => "RUNTIME_MODULE_ERROR",
            ErrorCategory::RuntimeJsonError => "RUNTIME_JSON_ERROR",
            ErrorCategory::UnhandledException => "UNHANDLED_EXCEPTION",
            ErrorCategory::RuntimeViewInvalid => "RUNTIME_VIEW_INVALID",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every failure the runtime can produce.
///
/// Variants are grouped by the component that raises them. Each carries
/// enough context to format a useful message and to classify itself via
/// [`RuntimeError::classify`]. Variants that wrap a typed native-module
/// error (`sys:`, `fs:`, `io:` prefixed messages) are modeled separately so
/// that the typed-exception construction path described in the runtime's
/// diagnostics bridge does not need to re-parse a formatted string.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A signed 64-bit arithmetic operation overflowed.
    #[error("int overflow")]
    IntOverflow,

    /// A list, string or bytes index fell outside `[0, len)`.
    #[error("index out of bounds")]
    IndexOutOfBounds,

    /// A string index into UTF-8 glyph positions fell outside the string.
    #[error("string index out of bounds")]
    StringIndexOutOfBounds,

    /// A map or object lookup found no entry for the given key.
    #[error("missing key")]
    MissingKey,

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivideByZero,

    /// A shift amount was negative or `>= 64`.
    #[error("invalid shift amount")]
    ShiftRange,

    /// `pop` was called on an empty list.
    #[error("pop on empty list")]
    EmptyPop,

    /// A byte value was outside `0..=255` where a named range check applies.
    #[error("byte out of range")]
    ByteRange,

    /// Bytes failed UTF-8 validation during a string conversion.
    #[error("invalid utf-8 sequence")]
    InvalidUtf8,

    /// A view's snapshot version no longer matches its source's live version.
    #[error("view invalidated")]
    ViewInvalid,

    /// A generic type mismatch (wrong operand kind for an operation).
    #[error("type error: {0}")]
    TypeError(String),

    /// Failure from the host filesystem/stream layer not covered above.
    #[error("io error: {0}")]
    Io(String),

    /// JSON encode/decode failure (IR loading, `to_json`/`from_json`).
    #[error("json error: {0}")]
    Json(String),

    /// Native module load or symbol-resolution failure.
    #[error("module error: {0}")]
    Module(String),

    /// A typed error surfaced by a native module via a `prefix:Type:message`
    /// convention (`sys:`, `fs:`, `io:`). Carries the already-split parts so
    /// the exception constructor in `protoscript-vm` does not need to parse
    /// the message again.
    #[error("{prefix}:{type_name}: {message}")]
    TypedModuleError {
        prefix: ModuleErrorPrefix,
        type_name: String,
        message: String,
    },

    /// Internal invariant violation; should never surface to a well-formed
    /// program. Kept distinct from `TypeError` so tests can assert it never
    /// fires instead of accidentally matching a legitimate type error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Allocation failure. ProtoScript's value constructors are fallible
    /// because the original runtime's were; Rust's global allocator aborts
    /// on true exhaustion, so this variant exists for parity with the error
    /// taxonomy rather than being reachable in practice.
    #[error("out of memory")]
    Oom,
}

/// The three native-module error prefixes the runtime understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleErrorPrefix {
    Sys,
    Fs,
    Io,
}

impl fmt::Display for ModuleErrorPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleErrorPrefix::Sys => "sys",
            ModuleErrorPrefix::Fs => "fs",
            ModuleErrorPrefix::Io => "io",
        };
        f.write_str(s)
    }
}

impl From<std::str::Utf8Error> for RuntimeError {
    fn from(_: std::str::Utf8Error) -> Self {
        RuntimeError::InvalidUtf8
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::Json(err.to_string())
    }
}

impl RuntimeError {
    /// Parses a native-module error message of the form `prefix:Type:body`
    /// into a [`RuntimeError::TypedModuleError`], returning `None` if the
    /// message does not use one of the three recognized prefixes.
    ///
    /// Grounded on the original runtime's `make_runtime_exception_from_error`,
    /// which special-cases these prefixes ahead of the generic code/category
    /// table.
    pub fn parse_typed_module_error(message: &str) -> Option<RuntimeError> {
        let (prefix_str, rest) = message.split_once(':')?;
        let prefix = match prefix_str {
            "sys" => ModuleErrorPrefix::Sys,
            "fs" => ModuleErrorPrefix::Fs,
            "io" => ModuleErrorPrefix::Io,
            _ => return None,
        };
        let (type_name, body) = rest.split_once(':')?;
        Some(RuntimeError::TypedModuleError {
            prefix,
            type_name: type_name.to_string(),
            message: body.to_string(),
        })
    }

    /// Classifies this error into the stable `(code, category)` pair used to
    /// populate a `RuntimeException`'s `code`/`category` fields.
    ///
    /// `TypedModuleError` has no code/category by design: the original
    /// runtime builds those exceptions without consulting the table at all,
    /// leaving `code`/`category` absent so a typed exception is recognized
    /// purely by its `type_name`/`parent` pair.
    pub fn classify(&self) -> Option<(ErrorCode, ErrorCategory)> {
        use ErrorCategory as C;
        use ErrorCode as E;
        let pair = match self {
            RuntimeError::IntOverflow => (E::IntOverflow, C::RuntimeIntOverflow),
            RuntimeError::IndexOutOfBounds | RuntimeError::StringIndexOutOfBounds => {
                (E::IndexOutOfBounds, C::RuntimeIndexOob)
            }
            RuntimeError::MissingKey => (E::MissingKey, C::RuntimeMissingKey),
            RuntimeError::DivideByZero => (E::DivideByZero, C::RuntimeDivideByZero),
            RuntimeError::ShiftRange => (E::ShiftRange, C::RuntimeShiftRange),
            RuntimeError::EmptyPop => (E::EmptyPop, C::RuntimeEmptyPop),
            RuntimeError::ByteRange => (E::ByteRange, C::RuntimeByteRange),
            RuntimeError::InvalidUtf8 => (E::InvalidUtf8, C::RuntimeInvalidUtf8),
            RuntimeError::ViewInvalid => (E::ViewInvalid, C::RuntimeViewInvalid),
            RuntimeError::Io(_) => (E::IoError, C::RuntimeIoError),
            RuntimeError::Json(_) => (E::JsonError, C::RuntimeJsonError),
            RuntimeError::Module(_) => (E::ModuleError, C::RuntimeModuleError),
            RuntimeError::Internal(msg) if is_io_shaped(msg) => (E::IoError, C::RuntimeIoError),
            RuntimeError::Internal(_) => (E::TypeError, C::RuntimeTypeError),
            RuntimeError::TypeError(msg) if is_json_shaped(msg) => {
                (E::JsonError, C::RuntimeJsonError)
            }
            RuntimeError::TypeError(msg) if is_io_shaped(msg) => (E::IoError, C::RuntimeIoError),
            RuntimeError::TypeError(_) => (E::TypeError, C::RuntimeTypeError),
            RuntimeError::TypedModuleError { .. } => return None,
            RuntimeError::Oom => (E::TypeError, C::RuntimeTypeError),
        };
        Some(pair)
    }
}

fn is_json_shaped(msg: &str) -> bool {
    msg.contains("Json") || msg.contains("JSON")
}

fn is_io_shaped(msg: &str) -> bool {
    const NEEDLES: &[&str] = &[
        "file", "read", "write", "seek", "tell", "stream", "open", "failed",
    ];
    let lower = msg.to_ascii_lowercase();
    NEEDLES.iter().any(|n| lower.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_int_overflow() {
        let (code, cat) = RuntimeError::IntOverflow.classify().unwrap();
        assert_eq!(code.as_str(), "R1001");
        assert_eq!(cat.as_str(), "RUNTIME_INT_OVERFLOW");
    }

    #[test]
    fn classify_index_variants_share_code() {
        assert_eq!(
            RuntimeError::IndexOutOfBounds.classify().unwrap().0,
            RuntimeError::StringIndexOutOfBounds.classify().unwrap().0
        );
    }

    #[test]
    fn classify_json_shaped_type_error() {
        let err = RuntimeError::TypeError("invalid Json payload".into());
        let (code, cat) = err.classify().unwrap();
        assert_eq!(code.as_str(), "R1010");
        assert_eq!(cat.as_str(), "RUNTIME_JSON_ERROR");
    }

    #[test]
    fn classify_io_shaped_type_error() {
        let err = RuntimeError::TypeError("failed to open file".into());
        let (_, cat) = err.classify().unwrap();
        assert_eq!(cat.as_str(), "RUNTIME_IO_ERROR");
    }

    #[test]
    fn classify_plain_type_error() {
        let err = RuntimeError::TypeError("expected int, got bool".into());
        let (_, cat) = err.classify().unwrap();
        assert_eq!(cat.as_str(), "RUNTIME_TYPE_ERROR");
    }

    #[test]
    fn typed_module_error_has_no_classification() {
        let err = RuntimeError::parse_typed_module_error("fs:NotFound:no such file").unwrap();
        assert!(err.classify().is_none());
    }

    #[test]
    fn parse_typed_module_error_rejects_unknown_prefix() {
        assert!(RuntimeError::parse_typed_module_error("oops:Type:body").is_none());
    }

    #[test]
    fn parse_typed_module_error_splits_correctly() {
        match RuntimeError::parse_typed_module_error("sys:Overflow:too big").unwrap() {
            RuntimeError::TypedModuleError {
                prefix,
                type_name,
                message,
            } => {
                assert_eq!(prefix, ModuleErrorPrefix::Sys);
                assert_eq!(type_name, "Overflow");
                assert_eq!(message, "too big");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}

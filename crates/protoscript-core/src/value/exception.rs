//! Exception values: the payload thrown/caught by `throw`/`try`/`catch`.

use super::{PsObject, Value};
use crate::error::{ErrorCategory, ErrorCode};

/// A thrown exception.
///
/// `file`/`line`/`column`/`message`/`cause`/`code`/`category` are first-class
/// named slots read/written directly by `member_get`/`member_set`, ahead of
/// the auxiliary `fields` bag holding any user-declared exception
/// subtype fields — this ordering is grounded on the original runtime's
/// `exception_get_field`.
#[derive(Debug)]
pub struct PsException {
    pub type_name: Box<str>,
    pub parent_name: Option<Box<str>>,
    /// Set for exceptions synthesized by the runtime itself (arithmetic
    /// errors, index errors, module errors, ...) as opposed to a user
    /// `throw` of a custom exception value. Drives the `"RuntimeException"`
    /// branch of `exception_is`.
    pub is_runtime: bool,
    pub file: Box<str>,
    pub line: u32,
    pub column: u32,
    pub message: Box<str>,
    pub cause: Option<Value>,
    pub code: Option<&'static str>,
    pub category: Option<&'static str>,
    /// Additional user-declared fields beyond the fixed slots above.
    pub fields: PsObject,
}

impl PsException {
    pub fn new(type_name: impl Into<Box<str>>, message: impl Into<Box<str>>) -> Self {
        let type_name = type_name.into();
        PsException {
            fields: PsObject::new(type_name.clone()),
            type_name,
            parent_name: Some("Exception".into()),
            is_runtime: false,
            file: "".into(),
            line: 1,
            column: 1,
            message: message.into(),
            cause: None,
            code: None,
            category: None,
        }
    }

    /// Builds a runtime exception from a classified [`RuntimeError`], per
    /// `make_runtime_exception_from_error`.
    pub fn from_runtime_error(
        message: impl Into<Box<str>>,
        classification: Option<(ErrorCode, ErrorCategory)>,
    ) -> Self {
        let mut exc = PsException::new("RuntimeException", message);
        exc.parent_name = Some("Exception".into());
        exc.is_runtime = true;
        if let Some((code, category)) = classification {
            exc.code = Some(code.as_str());
            exc.category = Some(category.as_str());
        }
        exc
    }

    /// Builds a typed exception from a `prefix:Type:message` native-module
    /// error, bypassing the code/category table entirely (the original
    /// runtime's special-cased path ahead of `ps_runtime_category`).
    pub fn from_typed_module_error(type_name: impl Into<Box<str>>, message: impl Into<Box<str>>) -> Self {
        let mut exc = PsException::new(type_name, message);
        exc.parent_name = Some("RuntimeException".into());
        exc.is_runtime = true;
        exc
    }

    pub fn type_name_static(&self) -> &'static str {
        "Exception"
    }

    pub fn set_location(&mut self, file: impl Into<Box<str>>, line: u32, column: u32) {
        self.file = file.into();
        self.line = line;
        self.column = column;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_exception_carries_classification() {
        let exc = PsException::from_runtime_error(
            "division by zero",
            Some((ErrorCode::DivideByZero, ErrorCategory::RuntimeDivideByZero)),
        );
        assert!(exc.is_runtime);
        assert_eq!(exc.code, Some("R1004"));
        assert_eq!(exc.category, Some("RUNTIME_DIVIDE_BY_ZERO"));
        assert_eq!(exc.parent_name.as_deref(), Some("Exception"));
    }

    #[test]
    fn typed_module_error_has_no_code() {
        let exc = PsException::from_typed_module_error("NotFound", "no such file");
        assert!(exc.code.is_none());
        assert_eq!(exc.parent_name.as_deref(), Some("RuntimeException"));
    }
}

//! Exception subsumption and named-field access, split out from
//! `interpreter.rs` because both need the IR module (for the prototype
//! parent chain) alongside the value itself.

use protoscript_core::error::RuntimeError;
use protoscript_core::value::{PsException, Value};
use protoscript_ir::model::Module;

/// `"Exception"` matches anything; `"RuntimeException"` matches any
/// runtime-synthesized exception; otherwise an exact type-name match or a
/// declared-prototype-parent-chain match. Grounded on the original
/// runtime's `exception_matches`.
pub fn exception_matches(module: &Module, exc: &PsException, type_name: &str) -> bool {
    if type_name == "Exception" {
        return true;
    }
    if type_name == "RuntimeException" {
        return exc.is_runtime;
    }
    if exc.type_name.as_ref() == type_name {
        return true;
    }
    module
        .find_proto(&exc.type_name)
        .map(|p| p.is_subtype_of(type_name, module))
        .unwrap_or(false)
}

/// The fixed named slots every exception exposes, checked before falling
/// back to the auxiliary field bag. Grounded on the original runtime's
/// `exception_get_field`.
pub fn exception_get_field(exc: &PsException, name: &str) -> Result<Value, RuntimeError> {
    match name {
        "file" => Ok(Value::String(std::rc::Rc::new(
            protoscript_core::value::PsString::new(exc.file.as_ref()),
        ))),
        "line" => Ok(Value::Int(exc.line as i64)),
        "column" => Ok(Value::Int(exc.column as i64)),
        "message" => Ok(Value::String(std::rc::Rc::new(
            protoscript_core::value::PsString::new(exc.message.as_ref()),
        ))),
        "cause" => Ok(exc.cause.clone().unwrap_or(Value::Void)),
        "code" => Ok(exc
            .code
            .map(|c| {
                Value::String(std::rc::Rc::new(protoscript_core::value::PsString::new(c)))
            })
            .unwrap_or(Value::Void)),
        "category" => Ok(exc
            .category
            .map(|c| {
                Value::String(std::rc::Rc::new(protoscript_core::value::PsString::new(c)))
            })
            .unwrap_or(Value::Void)),
        _ => Ok(exc.fields.get(name)),
    }
}

pub fn exception_set_field(
    exc: &mut PsException,
    name: &str,
    value: Value,
) -> Result<(), RuntimeError> {
    match name {
        "file" => {
            exc.file = value
                .as_str()
                .ok_or_else(|| RuntimeError::TypeError("file must be a String".into()))?
                .into();
            Ok(())
        }
        "line" => {
            exc.line = value
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("line must be an Int".into()))? as u32;
            Ok(())
        }
        "column" => {
            exc.column = value
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("column must be an Int".into()))?
                as u32;
            Ok(())
        }
        "message" => {
            exc.message = value
                .as_str()
                .ok_or_else(|| RuntimeError::TypeError("message must be a String".into()))?
                .into();
            Ok(())
        }
        "cause" => {
            exc.cause = Some(value);
            Ok(())
        }
        _ => exc.fields.set(name, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_module() -> Module {
        Module {
            module_name: None,
            functions: Vec::new(),
            protos: Vec::new(),
            groups: Vec::new(),
        }
    }

    #[test]
    fn exception_always_matches_itself() {
        let module = empty_module();
        let exc = PsException::new("CustomError", "boom");
        assert!(exception_matches(&module, &exc, "Exception"));
    }

    #[test]
    fn runtime_exception_matches_only_when_flagged() {
        let module = empty_module();
        let exc = PsException::new("CustomError", "boom");
        assert!(!exception_matches(&module, &exc, "RuntimeException"));
        let rt = PsException::from_runtime_error("oops", None);
        assert!(exception_matches(&module, &rt, "RuntimeException"));
    }

    #[test]
    fn named_slot_read_before_field_bag() {
        let exc = PsException::new("CustomError", "boom");
        assert_eq!(
            exception_get_field(&exc, "message").unwrap().as_str(),
            Some("boom")
        );
    }
}

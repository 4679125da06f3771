//! Marshaling between [`Value`] and the `#[repr(C)]` [`PsFfiValue`] wire
//! form, and the typed `arg`/`set_return` ergonomics layered on top.
//!
//! Grounded on the teacher's `CallContext` (`angelscript-core::runtime::
//! call_context`): typed argument extraction and typed return-value
//! setting, rather than making every call site hand-roll tag matches. The
//! difference here is the boundary being bridged — the teacher bridges a
//! VM stack slice to Rust; this bridges a Rust `Value` slice to a foreign
//! `#[repr(C)]` slice a dynamically loaded module reads.

use crate::abi::{PsFfiValue, PsTypeTag};
use protoscript_core::error::RuntimeError;
use protoscript_core::value::{PsString, Value};
use std::convert::TryFrom;
use std::rc::Rc;

/// Owns the UTF-8 byte buffers a marshaled argument list's string
/// payloads point into, so the `PsFfiValue` array handed to a native
/// function stays valid for the duration of the call.
pub struct FfiArgs {
    values: Vec<PsFfiValue>,
    _buffers: Vec<Box<[u8]>>,
}

impl FfiArgs {
    pub fn as_slice(&self) -> &[PsFfiValue] {
        &self.values
    }
}

/// Converts a host argument list into its FFI wire form. Only scalar and
/// string values may cross the native-module boundary (spec §4.6); any
/// other kind is a type error raised before the call is attempted.
pub fn marshal_args(args: &[Value]) -> Result<FfiArgs, RuntimeError> {
    let mut values = Vec::with_capacity(args.len());
    let mut buffers = Vec::new();
    for arg in args {
        let ffi = match arg {
            Value::Void => PsFfiValue::VOID,
            Value::Bool(b) => PsFfiValue {
                tag: PsTypeTag::Bool as u8,
                as_bool: *b,
                ..PsFfiValue::VOID
            },
            Value::Int(i) => PsFfiValue {
                tag: PsTypeTag::Int as u8,
                as_int: *i,
                ..PsFfiValue::VOID
            },
            Value::Float(f) => PsFfiValue {
                tag: PsTypeTag::Float as u8,
                as_float: *f,
                ..PsFfiValue::VOID
            },
            Value::Byte(b) => PsFfiValue {
                tag: PsTypeTag::Byte as u8,
                as_byte: *b,
                ..PsFfiValue::VOID
            },
            Value::Glyph(c) => PsFfiValue {
                tag: PsTypeTag::Glyph as u8,
                as_glyph: *c as u32,
                ..PsFfiValue::VOID
            },
            Value::String(s) => {
                let buf: Box<[u8]> = s.as_str().as_bytes().into();
                let ptr = buf.as_ptr();
                let len = buf.len();
                buffers.push(buf);
                PsFfiValue {
                    tag: PsTypeTag::String as u8,
                    str_ptr: ptr,
                    str_len: len,
                    ..PsFfiValue::VOID
                }
            }
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "{} cannot cross the native module boundary",
                    other.type_name()
                )))
            }
        };
        values.push(ffi);
    }
    Ok(FfiArgs {
        values,
        _buffers: buffers,
    })
}

/// Converts a native function's `out` slot back into a [`Value`]. The
/// string case copies the bytes out immediately: the callee's backing
/// buffer is not guaranteed to outlive the call.
///
/// # Safety
/// `out` must have been written by a `PsNativeFn` conforming to the
/// `PsFfiValue` contract (a `String`-tagged value's `str_ptr`/`str_len`
/// must describe a valid, UTF-8 byte range for the duration of this call).
pub unsafe fn unmarshal_return(out: &PsFfiValue) -> Result<Value, RuntimeError> {
    let tag = PsTypeTag::try_from(out.tag).map_err(|_| {
        RuntimeError::Internal(format!(
            "native module wrote an invalid PsTypeTag discriminant ({})",
            out.tag
        ))
    })?;
    Ok(match tag {
        PsTypeTag::Void => Value::Void,
        PsTypeTag::Bool => Value::Bool(out.as_bool),
        PsTypeTag::Int => Value::Int(out.as_int),
        PsTypeTag::Float => Value::Float(out.as_float),
        PsTypeTag::Byte => Value::Byte(out.as_byte),
        PsTypeTag::Glyph => Value::Glyph(
            char::from_u32(out.as_glyph)
                .ok_or_else(|| RuntimeError::Internal("native module returned an invalid glyph".into()))?,
        ),
        PsTypeTag::String => {
            // SAFETY: caller contract above.
            let bytes = unsafe { std::slice::from_raw_parts(out.str_ptr, out.str_len) };
            Value::String(Rc::new(PsString::from_utf8(bytes).map_err(RuntimeError::from)?))
        }
        PsTypeTag::Any => {
            return Err(RuntimeError::Internal(
                "native function returned the uninterpretable Any tag".into(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_rejects_list_arguments() {
        use protoscript_core::value::PsList;
        use std::cell::RefCell;
        let list = Value::List(Rc::new(RefCell::new(PsList::new())));
        assert!(marshal_args(&[list]).is_err());
    }

    #[test]
    fn marshal_then_unmarshal_roundtrips_a_string() {
        let args = marshal_args(&[Value::String(Rc::new(PsString::new("hi")))]).unwrap();
        let ffi = &args.as_slice()[0];
        let back = unsafe { unmarshal_return(ffi) }.unwrap();
        assert_eq!(back.as_str(), Some("hi"));
    }

    #[test]
    fn marshal_then_unmarshal_roundtrips_an_int() {
        let args = marshal_args(&[Value::Int(42)]).unwrap();
        let back = unsafe { unmarshal_return(&args.as_slice()[0]) }.unwrap();
        assert_eq!(back.as_int(), Some(42));
    }
}

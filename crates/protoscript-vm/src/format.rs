//! The built-in `to_string` conversion every value supports.
//!
//! Grounded on the original runtime's end-of-`exec_function` string
//! conversion block: integers and bytes use plain decimal, glyphs are
//! encoded to their UTF-8 form directly (not `"'a'"`-quoted), floats use the
//! shortest round-tripping decimal form Rust's own `f64::to_string`
//! already produces, and anything without a more specific rule falls back
//! to an opaque `"<TypeName>"` placeholder rather than panicking.

use protoscript_core::value::Value;

pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Void => "<void>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Byte(b) => b.to_string(),
        Value::Glyph(c) => c.to_string(),
        Value::Float(f) => format_float_shortest(*f),
        Value::String(s) => s.as_str().to_string(),
        Value::Bytes(_) => "<Bytes>".to_string(),
        Value::List(_) => "<List>".to_string(),
        Value::Map(_) => "<Map>".to_string(),
        Value::Object(obj) => format!("<{}>", obj.borrow().proto_name()),
        Value::View(_) => "<View>".to_string(),
        Value::Iter(_) => "<Iter>".to_string(),
        Value::File(_) => "<File>".to_string(),
        Value::Exception(exc) => {
            let exc = exc.borrow();
            format!("<{}: {}>", exc.type_name, exc.message)
        }
        Value::Group(group) => format!("{}.{}", group.group_name, group.member_name),
    }
}

/// Rust's `f64::to_string` already produces the shortest decimal string
/// that round-trips back to the same bit pattern (the same guarantee the
/// original runtime's hand-rolled `format_float_shortest` aimed for), with
/// one difference to normalize: ProtoScript always shows a decimal point
/// for finite values so `Float` output is never confused with `Int` output.
fn format_float_shortest(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    let s = f.to_string();
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_always_shows_decimal_point() {
        assert_eq!(format_float_shortest(3.0), "3.0");
        assert_eq!(format_float_shortest(3.5), "3.5");
    }

    #[test]
    fn glyph_encodes_as_its_own_utf8_form() {
        assert_eq!(to_display_string(&Value::Glyph('é')), "é");
    }

    #[test]
    fn bool_and_int_use_plain_form() {
        assert_eq!(to_display_string(&Value::Bool(true)), "true");
        assert_eq!(to_display_string(&Value::Int(-5)), "-5");
    }
}

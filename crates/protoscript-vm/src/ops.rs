//! Arithmetic, bitwise, logical and comparison operators.
//!
//! Integer arithmetic checks for overflow explicitly (`RuntimeError::IntOverflow`)
//! rather than wrapping or panicking, matching the runtime's `R1001`
//! contract; float arithmetic follows IEEE 754 (including `NaN`/infinity
//! propagation) with no additional checks, since the runtime never reports
//! float overflow as an error.

use ordered_float::OrderedFloat;
use protoscript_core::error::RuntimeError;
use protoscript_core::value::{hash_value, values_equal, Value};
use protoscript_ir::instr::{BinOpKind, UnOpKind};

pub fn eval_bin_op(op: BinOpKind, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    use BinOpKind::*;
    match op {
        Add | Sub | Mul | Div | Mod | Pow | BitAnd | BitOr | BitXor | ShiftLeft | ShiftRight => {
            arithmetic(op, lhs, rhs)
        }
        LogicalAnd => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        LogicalOr => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
        LogicalXor => Ok(Value::Bool(lhs.is_truthy() ^ rhs.is_truthy())),
        Equal => Ok(Value::Bool(values_equal(lhs, rhs))),
        NotEqual => Ok(Value::Bool(!values_equal(lhs, rhs))),
        Less | LessEqual | Greater | GreaterEqual => compare(op, lhs, rhs),
    }
}

fn arithmetic(op: BinOpKind, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    use BinOpKind::*;
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_arithmetic(op, *a, *b)?)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_arithmetic(op, *a as f64, *b)?)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_arithmetic(op, *a, *b as f64)?)),
        (Value::String(a), Value::String(b)) if op == Add => {
            Ok(Value::String(std::rc::Rc::new(a.concat(b))))
        }
        _ => Err(RuntimeError::TypeError(format!(
            "cannot apply {op:?} to {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn int_arithmetic(op: BinOpKind, a: i64, b: i64) -> Result<Value, RuntimeError> {
    use BinOpKind::*;
    let result = match op {
        Add => a.checked_add(b),
        Sub => a.checked_sub(b),
        Mul => a.checked_mul(b),
        Div => {
            if b == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            a.checked_div(b)
        }
        Mod => {
            if b == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            a.checked_rem(b)
        }
        Pow => {
            if b < 0 {
                return Err(RuntimeError::TypeError("negative exponent on Int".into()));
            }
            checked_pow(a, b as u32)
        }
        BitAnd => Some(a & b),
        BitOr => Some(a | b),
        BitXor => Some(a ^ b),
        ShiftLeft | ShiftRight => {
            if !(0..64).contains(&b) {
                return Err(RuntimeError::ShiftRange);
            }
            Some(if op == ShiftLeft { a << b } else { a >> b })
        }
        _ => unreachable!("arithmetic() only dispatches numeric ops here"),
    };
    result.map(Value::Int).ok_or(RuntimeError::IntOverflow)
}

fn checked_pow(base: i64, exp: u32) -> Option<i64> {
    let mut acc: i64 = 1;
    let mut b = base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            acc = acc.checked_mul(b)?;
        }
        e >>= 1;
        if e > 0 {
            b = b.checked_mul(b)?;
        }
    }
    Some(acc)
}

fn float_arithmetic(op: BinOpKind, a: f64, b: f64) -> Result<f64, RuntimeError> {
    use BinOpKind::*;
    Ok(match op {
        Add => a + b,
        Sub => a - b,
        Mul => a * b,
        Div => a / b,
        Mod => a % b,
        Pow => a.powf(b),
        BitAnd | BitOr | BitXor | ShiftLeft | ShiftRight => {
            return Err(RuntimeError::TypeError(format!(
                "{op:?} is not defined on Float"
            )))
        }
        _ => unreachable!("arithmetic() only dispatches numeric ops here"),
    })
}

fn compare(op: BinOpKind, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    use BinOpKind::*;
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
        (Value::Int(a), Value::Float(b)) => OrderedFloat(*a as f64).cmp(&OrderedFloat(*b)),
        (Value::Float(a), Value::Int(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b as f64)),
        (Value::String(a), Value::String(b)) => a.as_str().cmp(b.as_str()),
        (Value::Byte(a), Value::Byte(b)) => a.cmp(b),
        (Value::Glyph(a), Value::Glyph(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => {
            return Err(RuntimeError::TypeError(format!(
                "cannot compare {} and {}",
                lhs.type_name(),
                rhs.type_name()
            )))
        }
    };
    let result = match op {
        Less => ordering.is_lt(),
        LessEqual => ordering.is_le(),
        Greater => ordering.is_gt(),
        GreaterEqual => ordering.is_ge(),
        _ => unreachable!("compare() only dispatches ordering ops here"),
    };
    Ok(Value::Bool(result))
}

pub fn eval_un_op(op: UnOpKind, value: &Value) -> Result<Value, RuntimeError> {
    match (op, value) {
        (UnOpKind::Neg, Value::Int(i)) => {
            i.checked_neg().map(Value::Int).ok_or(RuntimeError::IntOverflow)
        }
        (UnOpKind::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOpKind::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnOpKind::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
        _ => Err(RuntimeError::TypeError(format!(
            "cannot apply {op:?} to {}",
            value.type_name()
        ))),
    }
}

/// Content hash re-export point for callers (map/object key hashing) that
/// only depend on `protoscript-vm`'s public surface rather than reaching
/// into `protoscript-core` directly.
pub fn content_hash(value: &Value) -> u64 {
    hash_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_add_overflow_errors() {
        let r = eval_bin_op(BinOpKind::Add, &Value::Int(i64::MAX), &Value::Int(1));
        assert!(matches!(r, Err(RuntimeError::IntOverflow)));
    }

    #[test]
    fn int_div_by_zero_errors() {
        let r = eval_bin_op(BinOpKind::Div, &Value::Int(1), &Value::Int(0));
        assert!(matches!(r, Err(RuntimeError::DivideByZero)));
    }

    #[test]
    fn shift_out_of_range_errors() {
        let r = eval_bin_op(BinOpKind::ShiftLeft, &Value::Int(1), &Value::Int(64));
        assert!(matches!(r, Err(RuntimeError::ShiftRange)));
    }

    #[test]
    fn mixed_int_float_promotes_to_float() {
        let r = eval_bin_op(BinOpKind::Add, &Value::Int(1), &Value::Float(0.5)).unwrap();
        assert_eq!(r.as_float(), Some(1.5));
    }

    #[test]
    fn equality_is_structural() {
        let r = eval_bin_op(BinOpKind::Equal, &Value::Int(3), &Value::Int(3)).unwrap();
        assert_eq!(r.as_bool(), Some(true));
    }

    #[test]
    fn logical_and_is_eager_and_narrow() {
        let r = eval_bin_op(BinOpKind::LogicalAnd, &Value::Bool(true), &Value::Int(1)).unwrap();
        assert_eq!(r.as_bool(), Some(true));
    }

    #[test]
    fn string_add_concatenates() {
        use protoscript_core::value::PsString;
        use std::rc::Rc;
        let a = Value::String(Rc::new(PsString::new("R1004")));
        let b = Value::String(Rc::new(PsString::new(" RUNTIME_DIVIDE_BY_ZERO")));
        let r = eval_bin_op(BinOpKind::Add, &a, &b).unwrap();
        assert_eq!(r.as_str(), Some("R1004 RUNTIME_DIVIDE_BY_ZERO"));
    }

    #[test]
    fn string_sub_is_a_type_error() {
        use protoscript_core::value::PsString;
        use std::rc::Rc;
        let a = Value::String(Rc::new(PsString::new("a")));
        let b = Value::String(Rc::new(PsString::new("b")));
        assert!(matches!(
            eval_bin_op(BinOpKind::Sub, &a, &b),
            Err(RuntimeError::TypeError(_))
        ));
    }

    #[test]
    fn glyphs_compare_by_scalar_value() {
        let r = eval_bin_op(BinOpKind::Less, &Value::Glyph('a'), &Value::Glyph('b')).unwrap();
        assert_eq!(r.as_bool(), Some(true));
    }

    #[test]
    fn bools_compare_false_less_than_true() {
        let r = eval_bin_op(BinOpKind::Less, &Value::Bool(false), &Value::Bool(true)).unwrap();
        assert_eq!(r.as_bool(), Some(true));
    }
}

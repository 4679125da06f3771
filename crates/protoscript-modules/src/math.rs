//! The bundled `Math` native module — a worked example of the native-ABI
//! surface (spec §4.6) that ships in-process rather than as a separate
//! `psmod_Math.so`, the same way the original runtime's WebAssembly build
//! dispatches a fixed set of core modules (Io, JSON, Math) to built-in
//! initializers instead of `dlopen` (spec §4.6: "if WebAssembly build,
//! dispatch to built-in initializers for a fixed set of core modules").
//! Desktop builds keep `Math` bundled unconditionally since it has no
//! platform dependency worth isolating behind a shared library.

use protoscript_core::error::RuntimeError;
use protoscript_core::value::Value;

fn arg_float(args: &[Value], i: usize) -> Result<f64, RuntimeError> {
    match args.get(i) {
        Some(Value::Float(f)) => Ok(*f),
        Some(Value::Int(n)) => Ok(*n as f64),
        Some(other) => Err(RuntimeError::TypeError(format!(
            "Math: argument {i} must be numeric, got {}",
            other.type_name()
        ))),
        None => Err(RuntimeError::TypeError(format!("Math: missing argument {i}"))),
    }
}

fn require_arity(args: &[Value], expected: usize, function: &str) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::Module(format!(
            "Math.{function}: expected {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

/// Dispatches one `Math.<function>` call. Returns `None` for an unknown
/// function name so the registry can fall through to "no such symbol"
/// rather than this module claiming every name in `Math`'s namespace.
pub fn call(function: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    let result = match function {
        "sqrt" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.sqrt())),
        "pow" => require_arity(args, 2, function).and_then(|_| {
            let base = arg_float(args, 0)?;
            let exp = arg_float(args, 1)?;
            Ok(Value::Float(base.powf(exp)))
        }),
        "abs" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.abs())),
        "floor" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.floor())),
        "ceil" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.ceil())),
        "round" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.round())),
        "min" => require_arity(args, 2, function).and_then(|_| {
            let a = arg_float(args, 0)?;
            let b = arg_float(args, 1)?;
            Ok(Value::Float(a.min(b)))
        }),
        "max" => require_arity(args, 2, function).and_then(|_| {
            let a = arg_float(args, 0)?;
            let b = arg_float(args, 1)?;
            Ok(Value::Float(a.max(b)))
        }),
        "sin" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.sin())),
        "cos" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.cos())),
        "ln" => require_arity(args, 1, function)
            .and_then(|_| arg_float(args, 0))
            .map(|x| Value::Float(x.ln())),
        "pi" => require_arity(args, 0, function).map(|_| Value::Float(std::f64::consts::PI)),
        "e" => require_arity(args, 0, function).map(|_| Value::Float(std::f64::consts::E)),
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_of_two() {
        let r = call("sqrt", &[Value::Float(2.0)]).unwrap().unwrap();
        assert_eq!(r.as_float(), Some(2.0f64.sqrt()));
    }

    #[test]
    fn unknown_function_is_none() {
        assert!(call("frobnicate", &[]).is_none());
    }

    #[test]
    fn wrong_arity_is_module_error() {
        let r = call("sqrt", &[]).unwrap();
        assert!(matches!(r, Err(RuntimeError::Module(_))));
    }

    #[test]
    fn pow_accepts_mixed_int_float() {
        let r = call("pow", &[Value::Int(2), Value::Float(10.0)]).unwrap().unwrap();
        assert_eq!(r.as_float(), Some(1024.0));
    }
}

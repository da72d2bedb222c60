use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;
use std::fmt;

/// Adapter that exposes a host object's fields and methods to scripts.
///
/// Rust has no runtime reflection, so a binding is a small hand-written
/// vtable: the evaluator resolves `value.x` by asking for a method first and
/// a field second, and calls resolved methods through `call_method`. The
/// conversion helpers below implement the argument conversion table so
/// binder implementations stay one line per parameter.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;

    /// Resolve a field by name; `None` falls through to method resolution.
    fn get_field(&self, name: &str) -> Option<Value>;

    fn has_method(&self, _name: &str) -> bool {
        false
    }

    fn call_method(&self, name: &str, _args: &[Value]) -> Result<Value, RuntimeError> {
        Err(RuntimeError::NoSuchProperty {
            name: name.to_string(),
            type_name: self.type_name().to_string(),
        })
    }
}

fn missing(index: usize) -> RuntimeError {
    RuntimeError::type_error(format!("argument {index}: missing"))
}

fn mismatch(index: usize, expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "argument {index}: expected {expected}, got {}",
        got.type_name()
    ))
}

/// Script number to host integer, truncated toward zero.
pub fn int_arg(args: &[Value], index: usize) -> Result<i64, RuntimeError> {
    let value = args.get(index).ok_or_else(|| missing(index))?;
    match value {
        Value::Number(n) => Ok(n.trunc() as i64),
        other => Err(mismatch(index, "number", other)),
    }
}

/// Script number to host unsigned integer; negative input is a type error
/// rather than a wrap.
pub fn uint_arg(args: &[Value], index: usize) -> Result<u64, RuntimeError> {
    let value = args.get(index).ok_or_else(|| missing(index))?;
    match value {
        Value::Number(n) if *n >= 0.0 => Ok(n.trunc() as u64),
        Value::Number(_) => Err(RuntimeError::type_error(format!(
            "argument {index}: expected non-negative number"
        ))),
        other => Err(mismatch(index, "number", other)),
    }
}

pub fn float_arg(args: &[Value], index: usize) -> Result<f64, RuntimeError> {
    let value = args.get(index).ok_or_else(|| missing(index))?;
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(mismatch(index, "number", other)),
    }
}

pub fn str_arg<'a>(args: &'a [Value], index: usize) -> Result<&'a str, RuntimeError> {
    let value = args.get(index).ok_or_else(|| missing(index))?;
    match value {
        Value::Str(s) => Ok(s),
        other => Err(mismatch(index, "string", other)),
    }
}

pub fn bool_arg(args: &[Value], index: usize) -> Result<bool, RuntimeError> {
    let value = args.get(index).ok_or_else(|| missing(index))?;
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(mismatch(index, "boolean", other)),
    }
}

/// Identity conversion for parameters that accept any script value.
pub fn value_arg(args: &[Value], index: usize) -> Result<Value, RuntimeError> {
    args.get(index).cloned().ok_or_else(|| missing(index))
}

use crate::language::ast::Block;
use crate::runtime::environment::EnvRef;
use crate::runtime::host::HostObject;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Calling convention for native functions: positional arguments in, value
/// or error message out. Natives live in registries shared across threads,
/// hence the `Send + Sync` bound.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// A runtime value. Arrays and objects are reference values: cloning shares
/// the backing store, and equality on them is pointer identity.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<IndexMap<String, Value>>>),
    Function(Rc<FunctionValue>),
    Native(NativeFunction),
    Host(Rc<dyn HostObject>),
    HostMethod(HostMethod),
}

/// A user function: parameter names, shared body, and the environment it
/// closed over at definition.
pub struct FunctionValue {
    pub params: Vec<String>,
    pub body: Arc<Block>,
    pub env: EnvRef,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.func.as_ref())(args)
    }
}

/// A host method bound to its receiver, produced by property access on a
/// host value and consumed by call application.
#[derive(Clone)]
pub struct HostMethod {
    pub receiver: Rc<dyn HostObject>,
    pub method: String,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(pairs: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(pairs)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Only null and false are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "boolean".into(),
            Value::Number(_) => "number".into(),
            Value::Str(_) => "string".into(),
            Value::Array(_) => "array".into(),
            Value::Object(_) => "object".into(),
            Value::Function(_) => "function".into(),
            Value::Native(_) => "native function".into(),
            Value::Host(host) => host.type_name().into(),
            Value::HostMethod(_) => "host method".into(),
        }
    }

    /// Structural equality on same-kind primitives, reference identity on
    /// containers and callables, `false` across kinds.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(&a.func, &b.func),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The textual rendering used by `print`, templates, and string
    /// concatenation. Integral numbers render without a decimal point.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Array(items) => {
                let rendered = items
                    .borrow()
                    .iter()
                    .map(Value::render)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
            Value::Object(pairs) => {
                let rendered = pairs
                    .borrow()
                    .iter()
                    .map(|(key, value)| format!("{key}: {}", value.render()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{rendered}}}")
            }
            Value::Function(func) => format!("<fn({})>", func.params.join(", ")),
            Value::Native(native) => format!("<native {}>", native.name),
            Value::Host(host) => format!("<{}>", host.type_name()),
            Value::HostMethod(method) => {
                format!("<{}.{}>", method.receiver.type_name(), method.method)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.render()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
        assert!(Value::array(Vec::new()).is_truthy());
    }

    #[test]
    fn integral_numbers_render_without_decimal() {
        assert_eq!(Value::Number(42.0).render(), "42");
        assert_eq!(Value::Number(3.5).render(), "3.5");
        assert_eq!(Value::Number(-7.0).render(), "-7");
    }

    #[test]
    fn containers_render_recursively() {
        let arr = Value::array(vec![Value::Number(1.0), Value::Str("x".into())]);
        assert_eq!(arr.render(), "[1, x]");
    }

    #[test]
    fn cross_kind_equality_is_false() {
        assert!(!Value::Number(1.0).equals(&Value::Str("1".into())));
        assert!(!Value::Bool(true).equals(&Value::Number(1.0)));
        assert!(Value::Null.equals(&Value::Null));
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);
        let a2 = a.clone();
        assert!(!a.equals(&b));
        assert!(a.equals(&a2));
    }
}

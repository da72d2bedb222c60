use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

/// A lexically chained frame of name bindings. The root frame owns the
/// captured `print` output buffer; enclosed frames share it.
pub struct Environment {
    store: HashMap<String, Value>,
    outer: Option<EnvRef>,
    output: Rc<RefCell<Vec<String>>>,
}

impl Environment {
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Self {
            store: HashMap::new(),
            outer: None,
            output: Rc::new(RefCell::new(Vec::new())),
        }))
    }

    /// A child frame for a function call, chained to the frame the callee
    /// captured at definition.
    pub fn enclosed(outer: &EnvRef) -> EnvRef {
        let output = outer.borrow().output.clone();
        Rc::new(RefCell::new(Self {
            store: HashMap::new(),
            outer: Some(outer.clone()),
            output,
        }))
    }

    /// Walks the chain outward until the name resolves.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.store.get(name) {
            return Some(value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.borrow().get(name))
    }

    /// Writes to the current frame only. Declaration and assignment both
    /// land here, so assigning a name bound in an enclosing frame shadows it
    /// instead of mutating it.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.store.insert(name.into(), value);
    }

    pub fn push_output(&self, line: String) {
        self.output.borrow_mut().push(line);
    }

    pub fn output(&self) -> Vec<String> {
        self.output.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_the_chain() {
        let root = Environment::new();
        root.borrow_mut().set("x", Value::Number(1.0));
        let child = Environment::enclosed(&root);
        assert!(matches!(
            child.borrow().get("x"),
            Some(Value::Number(n)) if n == 1.0
        ));
        assert!(child.borrow().get("missing").is_none());
    }

    #[test]
    fn set_writes_current_frame_only() {
        let root = Environment::new();
        root.borrow_mut().set("x", Value::Number(1.0));
        let child = Environment::enclosed(&root);
        child.borrow_mut().set("x", Value::Number(2.0));
        assert!(matches!(
            root.borrow().get("x"),
            Some(Value::Number(n)) if n == 1.0
        ));
        assert!(matches!(
            child.borrow().get("x"),
            Some(Value::Number(n)) if n == 2.0
        ));
    }

    #[test]
    fn output_buffer_is_shared_with_children() {
        let root = Environment::new();
        let child = Environment::enclosed(&root);
        child.borrow().push_output("hello".into());
        assert_eq!(root.borrow().output(), vec!["hello".to_string()]);
    }
}

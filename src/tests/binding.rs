use crate::runtime::error::RuntimeError;
use crate::runtime::host::{self, HostObject};
use crate::runtime::value::Value;
use crate::script::Script;
use std::cell::Cell;
use std::rc::Rc;

/// Hand-written vtable for a mutable host object, the way a host would
/// expose one of its own types to scripts.
#[derive(Debug)]
struct Rectangle {
    width: Cell<f64>,
    height: Cell<f64>,
}

impl Rectangle {
    fn new(width: f64, height: f64) -> Rc<Self> {
        Rc::new(Self {
            width: Cell::new(width),
            height: Cell::new(height),
        })
    }
}

impl HostObject for Rectangle {
    fn type_name(&self) -> &str {
        "Rectangle"
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "width" => Some(Value::Number(self.width.get())),
            "height" => Some(Value::Number(self.height.get())),
            // Shadowed by the method of the same name.
            "area" => Some(Value::Number(-1.0)),
            _ => None,
        }
    }

    fn has_method(&self, name: &str) -> bool {
        matches!(name, "area" | "scale" | "label" | "corners" | "explode")
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        match name {
            "area" => Ok(Value::Number(self.width.get() * self.height.get())),
            "scale" => {
                let factor = host::float_arg(args, 0)?;
                self.width.set(self.width.get() * factor);
                self.height.set(self.height.get() * factor);
                Ok(Value::Null)
            }
            "label" => {
                let prefix = host::str_arg(args, 0)?;
                let times = host::int_arg(args, 1)?;
                Ok(Value::Str(prefix.repeat(times.max(0) as usize)))
            }
            "corners" => Ok(Value::array(vec![
                Value::Number(self.width.get()),
                Value::Number(self.height.get()),
            ])),
            "explode" => Err(RuntimeError::Native {
                message: "rectangle exploded".into(),
            }),
            other => Err(RuntimeError::NoSuchProperty {
                name: other.to_string(),
                type_name: self.type_name().to_string(),
            }),
        }
    }
}

#[test]
fn fields_are_readable() {
    let result = Script::new("rect.width + rect.height")
        .bind("rect", Rectangle::new(3.0, 4.0))
        .silent_print(true)
        .execute();
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "7");
}

#[test]
fn methods_shadow_fields() {
    let result = Script::new("rect.area()")
        .bind("rect", Rectangle::new(3.0, 4.0))
        .silent_print(true)
        .execute();
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "12");
}

#[test]
fn mutating_method_is_visible_through_fields() {
    let rect = Rectangle::new(2.0, 5.0);
    let result = Script::new("rect.scale(2)\nrect.width")
        .bind("rect", rect.clone())
        .silent_print(true)
        .execute();
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "4");
    // The host sees the mutation too.
    assert_eq!(rect.height.get(), 10.0);
}

#[test]
fn integer_parameters_truncate_toward_zero() {
    let result = Script::new("rect.label(\"ab\", 2.9)")
        .bind("rect", Rectangle::new(1.0, 1.0))
        .silent_print(true)
        .execute();
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "abab");
}

#[test]
fn argument_type_mismatch_names_the_parameter() {
    let result = Script::new("rect.scale(\"wide\")")
        .bind("rect", Rectangle::new(1.0, 1.0))
        .silent_print(true)
        .execute();
    assert_eq!(
        result.errors,
        vec!["argument 0: expected number, got string"]
    );
}

#[test]
fn missing_arguments_are_type_errors() {
    let result = Script::new("rect.label(\"ab\")")
        .bind("rect", Rectangle::new(1.0, 1.0))
        .silent_print(true)
        .execute();
    assert_eq!(result.errors, vec!["argument 1: missing"]);
}

#[test]
fn unknown_property_is_an_error() {
    let result = Script::new("rect.diagonal")
        .bind("rect", Rectangle::new(1.0, 1.0))
        .silent_print(true)
        .execute();
    assert_eq!(
        result.errors,
        vec!["property or method 'diagonal' not found on Rectangle"]
    );
}

#[test]
fn safe_access_on_unknown_property_yields_null() {
    let result = Script::new("rect?.diagonal ?: \"none\"")
        .bind("rect", Rectangle::new(1.0, 1.0))
        .silent_print(true)
        .execute();
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "none");
}

#[test]
fn host_errors_surface_verbatim() {
    let result = Script::new("rect.explode()")
        .bind("rect", Rectangle::new(1.0, 1.0))
        .silent_print(true)
        .execute();
    assert_eq!(result.errors, vec!["rectangle exploded"]);
}

#[test]
fn multi_value_methods_return_arrays() {
    let result = Script::new("rect.corners()[1]")
        .bind("rect", Rectangle::new(3.0, 9.0))
        .silent_print(true)
        .execute();
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "9");
}

#[test]
fn bound_values_flow_through_script_logic() {
    let source = "let sides = rect.corners()\nlet sum = 0\nfor (s in sides) { sum = sum + s }\nsum";
    let result = Script::new(source)
        .bind("rect", Rectangle::new(3.0, 4.0))
        .silent_print(true)
        .execute();
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "7");
}

#[test]
fn operation_limit_applies_with_bindings() {
    let source = "let sum = 0\nfor (i in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]) { sum = sum + rect.width }\nsum";
    let result = Script::new(source)
        .bind("rect", Rectangle::new(1.0, 1.0))
        .with_max_operations(5)
        .silent_print(true)
        .execute();
    assert_eq!(result.errors, vec!["operation limit exceeded"]);
}

use crate::language::ast::*;
use crate::runtime::{
    environment::{EnvRef, Environment},
    error::{RuntimeError, RuntimeResult},
    natives::Registry,
    value::{FunctionValue, HostMethod, Value},
};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// How a statement's result travels: an ordinary value, or an in-flight
/// `return` that unwinds to the nearest call boundary (or top level).
enum Flow {
    Value(Value),
    Return(Value),
}

/// Tree-walking evaluator over one environment chain. One instance runs one
/// script at a time; hosts run scripts in parallel by giving each its own
/// interpreter.
pub struct Interpreter {
    env: EnvRef,
    registry: Registry,
    silent_print: bool,
    max_ops: u64,
    op_count: u64,
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            registry: Registry::new(),
            silent_print: false,
            max_ops: 0,
            op_count: 0,
            deadline: None,
            cancelled: None,
        }
    }

    /// An interpreter whose root frame is pre-populated with host variables.
    pub fn with_variables(variables: HashMap<String, Value>) -> Self {
        let interp = Self::new();
        for (name, value) in variables {
            interp.env.borrow_mut().set(name, value);
        }
        interp
    }

    /// Binds a value in the root frame, used for host objects and late
    /// variable injection.
    pub fn set_global(&self, name: &str, value: Value) {
        self.env.borrow_mut().set(name, value);
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn set_registry(&mut self, registry: Registry) {
        self.registry = registry;
    }

    /// When set, `print` only fills the capture buffer instead of also
    /// writing to stdout.
    pub fn set_silent_print(&mut self, silent: bool) {
        self.silent_print = silent;
    }

    /// Zero means unlimited.
    pub fn set_max_operations(&mut self, max_ops: u64) {
        self.max_ops = max_ops;
    }

    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// A shared flag a watchdog thread may raise; the evaluator fails with a
    /// timeout at the next statement boundary.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancelled = Some(flag);
    }

    /// Captured `print` output, in emission order.
    pub fn output(&self) -> Vec<String> {
        self.env.borrow().output()
    }

    /// Evaluates a program statement by statement, yielding the value of the
    /// last statement, or the value of a top-level `return`.
    pub fn eval(&mut self, program: &Program) -> RuntimeResult<Value> {
        self.op_count = 0;
        let mut result = Value::Null;
        for stmt in &program.statements {
            match self.eval_statement(stmt)? {
                Flow::Return(value) => return Ok(value),
                Flow::Value(value) => result = value,
            }
        }
        Ok(result)
    }

    /// Cooperative cancellation checkpoint: called for every statement and
    /// every loop iteration.
    fn checkpoint(&mut self) -> RuntimeResult<()> {
        self.op_count += 1;
        if self.max_ops > 0 && self.op_count > self.max_ops {
            return Err(RuntimeError::OperationLimitExceeded);
        }
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::Relaxed) {
                return Err(RuntimeError::Timeout);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(RuntimeError::Timeout);
            }
        }
        Ok(())
    }

    fn eval_statement(&mut self, stmt: &Statement) -> RuntimeResult<Flow> {
        self.checkpoint()?;
        match stmt {
            Statement::Let(stmt) => {
                let value = self.eval_expression(&stmt.value)?;
                self.env.borrow_mut().set(&stmt.name, value.clone());
                Ok(Flow::Value(value))
            }
            Statement::Assign(stmt) => {
                let value = self.eval_expression(&stmt.value)?;
                self.env.borrow_mut().set(&stmt.name, value.clone());
                Ok(Flow::Value(value))
            }
            Statement::Expr(stmt) => self.eval_expression(&stmt.expr).map(Flow::Value),
            Statement::If(stmt) => self.eval_if(stmt),
            Statement::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.eval_expression(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::ForIn(stmt) => self.eval_for_in(stmt),
        }
    }

    fn eval_if(&mut self, stmt: &IfStmt) -> RuntimeResult<Flow> {
        let condition = self.eval_expression(&stmt.condition)?;
        if condition.is_truthy() {
            self.eval_block(&stmt.consequence)
        } else if let Some(alternative) = &stmt.alternative {
            self.eval_block(alternative)
        } else {
            Ok(Flow::Value(Value::Null))
        }
    }

    /// Blocks evaluate in the surrounding frame; only calls open a new one.
    fn eval_block(&mut self, block: &Block) -> RuntimeResult<Flow> {
        let mut result = Value::Null;
        for stmt in &block.statements {
            match self.eval_statement(stmt)? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Value(value) => result = value,
            }
        }
        Ok(Flow::Value(result))
    }

    fn eval_for_in(&mut self, stmt: &ForInStmt) -> RuntimeResult<Flow> {
        let iterable = self.eval_expression(&stmt.iterable)?;
        let items = match &iterable {
            Value::Array(items) => items.borrow().clone(),
            other => {
                return Err(RuntimeError::IterableNotArray {
                    type_name: other.type_name(),
                });
            }
        };

        let mut result = Value::Null;
        for item in items {
            self.checkpoint()?;
            // The loop variable lives in the surrounding frame.
            self.env.borrow_mut().set(&stmt.variable, item);
            match self.eval_block(&stmt.body)? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Value(value) => result = value,
            }
        }
        Ok(Flow::Value(result))
    }

    fn eval_expression(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Number(lit) => Ok(Value::Number(lit.value)),
            Expr::Str(lit) => Ok(Value::Str(lit.value.clone())),
            Expr::Bool(lit) => Ok(Value::Bool(lit.value)),
            Expr::Null(_) => Ok(Value::Null),
            Expr::Ident(ident) => self.eval_identifier(ident),
            Expr::Unary(unary) => self.eval_unary(unary),
            Expr::Binary(binary) => self.eval_binary(binary),
            Expr::Property(prop) => {
                let object = self.eval_expression(&prop.object)?;
                self.eval_property(object, &prop.property, false)
            }
            Expr::SafeProperty(prop) => {
                let object = self.eval_expression(&prop.object)?;
                self.eval_property(object, &prop.property, true)
            }
            Expr::Elvis(elvis) => {
                let left = self.eval_expression(&elvis.left)?;
                if left.is_null() {
                    self.eval_expression(&elvis.default)
                } else {
                    Ok(left)
                }
            }
            Expr::Index(index) => {
                let object = self.eval_expression(&index.object)?;
                let key = self.eval_expression(&index.index)?;
                self.eval_index(object, key)
            }
            Expr::Array(lit) => {
                let mut items = Vec::with_capacity(lit.elements.len());
                for element in &lit.elements {
                    items.push(self.eval_expression(element)?);
                }
                Ok(Value::array(items))
            }
            Expr::Object(lit) => {
                let mut pairs = indexmap::IndexMap::with_capacity(lit.pairs.len());
                for (key, value) in &lit.pairs {
                    pairs.insert(key.clone(), self.eval_expression(value)?);
                }
                Ok(Value::object(pairs))
            }
            Expr::Function(lit) => Ok(Value::Function(Rc::new(FunctionValue {
                params: lit.params.clone(),
                body: lit.body.clone(),
                env: self.env.clone(),
            }))),
            Expr::Call(call) => self.eval_call(call),
            Expr::Template(template) => self.eval_template(template),
        }
    }

    fn eval_identifier(&mut self, ident: &Ident) -> RuntimeResult<Value> {
        if let Some(value) = self.env.borrow().get(&ident.name) {
            return Ok(value);
        }
        if let Some(native) = self.registry.lookup(&ident.name) {
            return Ok(Value::Native(native));
        }
        Err(RuntimeError::UndefinedName {
            name: ident.name.clone(),
        })
    }

    fn eval_unary(&mut self, unary: &UnaryExpr) -> RuntimeResult<Value> {
        let right = self.eval_expression(&unary.right)?;
        match unary.op {
            UnaryOp::Neg => match right.as_number() {
                Some(n) => Ok(Value::Number(-n)),
                None => Err(RuntimeError::type_error(format!(
                    "cannot negate {}",
                    right.type_name()
                ))),
            },
            UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
        }
    }

    fn eval_binary(&mut self, binary: &BinaryExpr) -> RuntimeResult<Value> {
        let left = self.eval_expression(&binary.left)?;

        // && and || short-circuit and yield the truthiness of the last
        // operand evaluated, not the operand itself.
        match binary.op {
            BinaryOp::And => {
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval_expression(&binary.right)?;
                return Ok(Value::Bool(right.is_truthy()));
            }
            BinaryOp::Or => {
                if left.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval_expression(&binary.right)?;
                return Ok(Value::Bool(right.is_truthy()));
            }
            _ => {}
        }

        let right = self.eval_expression(&binary.right)?;
        match binary.op {
            BinaryOp::Add => self.eval_plus(left, right),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.eval_arithmetic(binary.op, left, right)
            }
            BinaryOp::Eq => Ok(Value::Bool(left.equals(&right))),
            BinaryOp::NotEq => Ok(Value::Bool(!left.equals(&right))),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
                self.eval_comparison(binary.op, left, right)
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    /// `+` concatenates when either side is a string, otherwise adds numbers.
    fn eval_plus(&self, left: Value, right: Value) -> RuntimeResult<Value> {
        if let Value::Str(l) = &left {
            return Ok(Value::Str(format!("{l}{}", right.render())));
        }
        if let Value::Str(r) = &right {
            return Ok(Value::Str(format!("{}{r}", left.render())));
        }
        match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => Ok(Value::Number(l + r)),
            _ => Err(RuntimeError::type_error(format!(
                "cannot add {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        }
    }

    fn eval_arithmetic(&self, op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
        let (l, r) = match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                return Err(RuntimeError::type_error(format!(
                    "cannot perform {} on {} and {}",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                )));
            }
        };
        match op {
            BinaryOp::Sub => Ok(Value::Number(l - r)),
            BinaryOp::Mul => Ok(Value::Number(l * r)),
            BinaryOp::Div => {
                if r == 0.0 {
                    return Err(RuntimeError::DivideByZero);
                }
                Ok(Value::Number(l / r))
            }
            BinaryOp::Rem => {
                if r == 0.0 {
                    return Err(RuntimeError::DivideByZero);
                }
                Ok(Value::Number(l % r))
            }
            _ => unreachable!("not an arithmetic operator"),
        }
    }

    fn eval_comparison(&self, op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
        let (l, r) = match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                return Err(RuntimeError::type_error(format!(
                    "cannot compare {} and {}",
                    left.type_name(),
                    right.type_name()
                )));
            }
        };
        let result = match op {
            BinaryOp::Lt => l < r,
            BinaryOp::Gt => l > r,
            BinaryOp::LtEq => l <= r,
            BinaryOp::GtEq => l >= r,
            _ => unreachable!("not a comparison operator"),
        };
        Ok(Value::Bool(result))
    }

    fn eval_property(&mut self, object: Value, name: &str, safe: bool) -> RuntimeResult<Value> {
        match object {
            Value::Null => {
                if safe {
                    Ok(Value::Null)
                } else {
                    Err(RuntimeError::NullPropertyAccess {
                        name: name.to_string(),
                    })
                }
            }
            Value::Object(pairs) => Ok(pairs.borrow().get(name).cloned().unwrap_or(Value::Null)),
            Value::Host(host) => {
                // Methods shadow fields, and mutating methods stay callable
                // because the adapter receives the shared receiver.
                if host.has_method(name) {
                    return Ok(Value::HostMethod(HostMethod {
                        receiver: host.clone(),
                        method: name.to_string(),
                    }));
                }
                if let Some(value) = host.get_field(name) {
                    return Ok(value);
                }
                if safe {
                    Ok(Value::Null)
                } else {
                    Err(RuntimeError::NoSuchProperty {
                        name: name.to_string(),
                        type_name: host.type_name().to_string(),
                    })
                }
            }
            other => {
                if safe {
                    Ok(Value::Null)
                } else {
                    Err(RuntimeError::type_error(format!(
                        "cannot access property '{}' on {}",
                        name,
                        other.type_name()
                    )))
                }
            }
        }
    }

    fn eval_index(&mut self, object: Value, key: Value) -> RuntimeResult<Value> {
        match &object {
            Value::Array(items) => {
                let index = match key.as_number() {
                    // Truncation toward zero.
                    Some(n) => n.trunc() as i64,
                    None => {
                        return Err(RuntimeError::type_error("index must be a number"));
                    }
                };
                let items = items.borrow();
                if index < 0 || index as usize >= items.len() {
                    return Ok(Value::Null);
                }
                Ok(items[index as usize].clone())
            }
            Value::Object(pairs) => match &key {
                Value::Str(k) => Ok(pairs.borrow().get(k).cloned().unwrap_or(Value::Null)),
                _ => Err(RuntimeError::type_error("object key must be a string")),
            },
            other => Err(RuntimeError::IndexTypeError {
                type_name: other.type_name(),
            }),
        }
    }

    fn eval_call(&mut self, call: &CallExpr) -> RuntimeResult<Value> {
        // `print` is resolved by name before any lookup so the capture
        // buffer sees it even when shadowed natives exist.
        if let Expr::Ident(ident) = &call.callee {
            if ident.name == "print" {
                return self.eval_print(&call.args);
            }
        }

        let callee = self.eval_expression(&call.callee)?;
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.eval_expression(arg)?);
        }
        self.apply_function(callee, args)
    }

    fn eval_print(&mut self, args: &[Expr]) -> RuntimeResult<Value> {
        let mut lines = Vec::with_capacity(args.len());
        for arg in args {
            lines.push(self.eval_expression(arg)?.render());
        }
        for line in lines {
            if !self.silent_print {
                println!("{line}");
            }
            self.env.borrow().push_output(line);
        }
        Ok(Value::Null)
    }

    fn apply_function(&mut self, callee: Value, args: Vec<Value>) -> RuntimeResult<Value> {
        match callee {
            Value::Function(func) => {
                let call_env = Environment::enclosed(&func.env);
                for (index, param) in func.params.iter().enumerate() {
                    // Excess arguments are dropped; missing ones bind null.
                    let value = args.get(index).cloned().unwrap_or(Value::Null);
                    call_env.borrow_mut().set(param, value);
                }
                let saved = std::mem::replace(&mut self.env, call_env);
                let result = self.eval_block(&func.body);
                self.env = saved;
                match result? {
                    Flow::Return(value) | Flow::Value(value) => Ok(value),
                }
            }
            Value::Native(native) => native
                .call(&args)
                .map_err(|message| RuntimeError::Native { message }),
            Value::HostMethod(method) => method.receiver.call_method(&method.method, &args),
            other => Err(RuntimeError::NotAFunction {
                type_name: other.type_name(),
            }),
        }
    }

    fn eval_template(&mut self, template: &TemplateLit) -> RuntimeResult<Value> {
        let mut result = String::new();
        for part in &template.parts {
            let value = self.eval_expression(part)?;
            result.push_str(&value.render());
        }
        Ok(Value::Str(result))
    }
}

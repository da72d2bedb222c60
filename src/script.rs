use crate::cache::AstCache;
use crate::language::ast::Program;
use crate::language::parser::parse_program;
use crate::runtime::host::HostObject;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::natives::Registry;
use crate::runtime::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Fluent embedding surface: configure a script, then [`Script::execute`].
///
/// ```
/// use rillscript::Script;
///
/// let result = Script::new("let x = 2\nx * 21").execute();
/// assert!(result.is_ok());
/// assert_eq!(result.value.render(), "42");
/// ```
pub struct Script {
    source: String,
    variables: HashMap<String, Value>,
    bindings: Vec<(String, Rc<dyn HostObject>)>,
    registry: Registry,
    silent_print: bool,
    use_cache: bool,
    max_ops: u64,
    timeout: Duration,
}

/// What an execution produced: the final value, the captured `print` lines,
/// and the error messages (empty on success).
#[derive(Debug)]
pub struct ScriptResult {
    pub value: Value,
    pub output: Vec<String>,
    pub errors: Vec<String>,
}

impl ScriptResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn failed(errors: Vec<String>) -> Self {
        Self {
            value: Value::Null,
            output: Vec::new(),
            errors,
        }
    }
}

impl Script {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            variables: HashMap::new(),
            bindings: Vec::new(),
            registry: Registry::new(),
            silent_print: false,
            use_cache: true,
            max_ops: 0,
            timeout: Duration::ZERO,
        }
    }

    /// Enables or disables the shared AST cache (on by default).
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Pre-binds host variables in the script's root frame.
    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Suppresses `print` output to stdout; the capture buffer still fills.
    pub fn silent_print(mut self, silent: bool) -> Self {
        self.silent_print = silent;
        self
    }

    /// Registers a native in this script's overlay, shadowing any built-in
    /// of the same name for this script only.
    pub fn register_function<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.registry.register(name, func);
        self
    }

    /// Binds an opaque host object; its fields and methods become reachable
    /// through the reflective adapter.
    pub fn bind(mut self, name: impl Into<String>, object: Rc<dyn HostObject>) -> Self {
        self.bindings.push((name.into(), object));
        self
    }

    /// Caps the number of statement-level operations (0 = unlimited).
    pub fn with_max_operations(mut self, max_ops: u64) -> Self {
        self.max_ops = max_ops;
        self
    }

    /// Arms an execution deadline (zero = none).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn execute(&self) -> ScriptResult {
        let program = match self.parse() {
            Ok(program) => program,
            Err(errors) => return ScriptResult::failed(errors),
        };

        let mut interp = Interpreter::with_variables(self.variables.clone());
        for (name, object) in &self.bindings {
            interp.set_global(name, Value::Host(object.clone()));
        }
        interp.set_registry(self.registry.clone());
        interp.set_silent_print(self.silent_print);
        if self.max_ops > 0 {
            interp.set_max_operations(self.max_ops);
        }
        if !self.timeout.is_zero() {
            interp.set_deadline(Some(Instant::now() + self.timeout));
        }

        match interp.eval(&program) {
            Ok(value) => ScriptResult {
                value,
                output: interp.output(),
                errors: Vec::new(),
            },
            Err(err) => ScriptResult::failed(vec![err.to_string()]),
        }
    }

    fn parse(&self) -> Result<Arc<Program>, Vec<String>> {
        if self.use_cache {
            if let Some(program) = AstCache::global().get(&self.source) {
                debug!("reusing cached parse");
                return Ok(program);
            }
        }
        match parse_program(&self.source) {
            Ok(program) => {
                let program = Arc::new(program);
                if self.use_cache {
                    AstCache::global().set(&self.source, program.clone());
                }
                Ok(program)
            }
            Err(errors) => Err(errors.messages()),
        }
    }
}

/// One-shot execution of `source` with optional pre-bound variables.
pub fn run(source: &str, variables: HashMap<String, Value>) -> ScriptResult {
    let mut script = Script::new(source).silent_print(true);
    if !variables.is_empty() {
        script = script.with_variables(variables);
    }
    script.execute()
}

/// The simplest entry point: evaluate `source` and hand back the value.
pub fn eval(source: &str) -> Result<Value, EvalError> {
    let result = run(source, HashMap::new());
    if result.errors.is_empty() {
        Ok(result.value)
    } else {
        Err(EvalError {
            messages: result.errors,
        })
    }
}

/// Collected messages from a failed [`eval`].
#[derive(Clone, Debug)]
pub struct EvalError {
    pub messages: Vec<String>,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.messages.first() {
            Some(message) => f.write_str(message),
            None => f.write_str("unknown error"),
        }
    }
}

impl std::error::Error for EvalError {}

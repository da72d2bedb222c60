pub mod cache;
pub mod diagnostics;
pub mod language;
pub mod runtime;
pub mod script;

pub use cache::AstCache;
pub use language::errors::{SyntaxError, SyntaxErrors};
pub use language::parser::parse_program;
pub use runtime::error::RuntimeError;
pub use runtime::host::HostObject;
pub use runtime::interpreter::Interpreter;
pub use runtime::natives::Registry;
pub use runtime::value::{NativeFn, Value};
pub use script::{eval, run, EvalError, Script, ScriptResult};

#[cfg(test)]
mod tests;

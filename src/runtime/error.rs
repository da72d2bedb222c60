use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Every way an evaluation can fail. The first runtime error aborts the
/// script; `code()` gives hosts a stable identifier to match on without
/// parsing messages.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("undefined variable: {name}")]
    UndefinedName { name: String },
    #[error("property or method '{name}' not found on {type_name}")]
    NoSuchProperty { name: String, type_name: String },
    #[error("not a function: {type_name}")]
    NotAFunction { type_name: String },
    #[error("{message}")]
    TypeError { message: String },
    #[error("division by zero")]
    DivideByZero,
    #[error("index operator not supported on {type_name}")]
    IndexTypeError { type_name: String },
    #[error("for-in requires an array, got {type_name}")]
    IterableNotArray { type_name: String },
    #[error("cannot access property '{name}' on null")]
    NullPropertyAccess { name: String },
    #[error("operation limit exceeded")]
    OperationLimitExceeded,
    #[error("execution timeout")]
    Timeout,
    /// An error surfaced verbatim from a native function or host binding.
    #[error("{message}")]
    Native { message: String },
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::UndefinedName { .. } => "undefined-name",
            RuntimeError::NoSuchProperty { .. } => "no-such-property",
            RuntimeError::NotAFunction { .. } => "not-a-function",
            RuntimeError::TypeError { .. } => "type-error",
            RuntimeError::DivideByZero => "divide-by-zero",
            RuntimeError::IndexTypeError { .. } => "index-type-error",
            RuntimeError::IterableNotArray { .. } => "iterable-not-array",
            RuntimeError::NullPropertyAccess { .. } => "null-property-access",
            RuntimeError::OperationLimitExceeded => "operation-limit-exceeded",
            RuntimeError::Timeout => "timeout",
            RuntimeError::Native { .. } => "native-error",
        }
    }
}

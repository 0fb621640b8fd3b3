//! Error taxonomy for the decision model (spec.md §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Decision-model errors. Every variant carries the decision name (and, for table
/// errors, a rule id) so callers can report "what went wrong, where" without
/// re-deriving it from a raw `dmn_feel::Error`.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("type error in decision '{decision}': {message}")]
    TypeError { decision: String, message: String },

    #[error("unknown name in decision '{decision}': {name}")]
    UnknownName { decision: String, name: String },

    #[error("division by zero in decision '{decision}'")]
    DivisionByZero { decision: String },

    #[error("hit policy violation in decision '{decision}': {message}")]
    HitPolicyViolation { decision: String, message: String },

    #[error("table schema error in decision '{decision}': {message}")]
    TableSchemaError { decision: String, message: String },

    #[error("builtin error in decision '{decision}': {message}")]
    BuiltinError { decision: String, message: String },
}

impl Error {
    /// Attaches decision context to a `dmn_feel::Error` raised while evaluating an
    /// expression or unary test that belongs to `decision`.
    pub fn from_feel(decision: &str, err: dmn_feel::Error) -> Self {
        use dmn_feel::Error as F;
        let decision = decision.to_string();
        match err {
            F::ParseError(message) => Error::ParseError(message),
            F::TypeError(message) => Error::TypeError { decision, message },
            F::UnknownName(name) => Error::UnknownName { decision, name },
            F::DivisionByZero => Error::DivisionByZero { decision },
            F::UnknownFunction(name) => Error::BuiltinError {
                decision,
                message: format!("unknown function: {name}"),
            },
            F::InvalidArgument(message) | F::BuiltinError(message) => {
                Error::BuiltinError { decision, message }
            }
        }
    }

    pub fn decision_name(&self) -> Option<&str> {
        match self {
            Error::ParseError(_) => None,
            Error::TypeError { decision, .. }
            | Error::UnknownName { decision, .. }
            | Error::DivisionByZero { decision }
            | Error::HitPolicyViolation { decision, .. }
            | Error::TableSchemaError { decision, .. }
            | Error::BuiltinError { decision, .. } => Some(decision),
        }
    }
}

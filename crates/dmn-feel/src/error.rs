//! Error types for the FEEL engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// FEEL lexing, parsing, and evaluation errors.
///
/// Mirrors the taxonomy a DMN engine needs: parse-time failures are distinguished
/// from the run-time failures an expression evaluation can raise.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("unknown name: {0}")]
    UnknownName(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("builtin error: {0}")]
    BuiltinError(String),
}

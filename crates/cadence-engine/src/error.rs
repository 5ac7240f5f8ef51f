//! Error types for schedule evaluation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

pub type Result<T> = std::result::Result<T, CadenceError>;

use std::fmt;

use crate::stylesheet::ParseError;

/// Which bound pair failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeContext {
    Size,
    Width,
}

impl fmt::Display for RangeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeContext::Size => f.write_str("size"),
            RangeContext::Width => f.write_str("width"),
        }
    }
}

/// Every failure is fatal to the current run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RulerError {
    #[error("[ruler] {0}")]
    Configuration(String),

    #[error("[ruler] Invalid {context} range: min ({min}) must be less than max ({max})")]
    Range {
        context: RangeContext,
        min: f64,
        max: f64,
    },

    #[error("[ruler] {0}")]
    Syntax(#[from] ParseError),
}

impl RulerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        RulerError::Configuration(message.into())
    }
}

pub type RulerResult<T> = Result<T, RulerError>;

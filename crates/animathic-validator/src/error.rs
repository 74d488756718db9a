//! Validator error types (spec §4.1).

use animathic_models::ErrorKind;
use thiserror::Error;

pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// A token plus its 1-based source line, attached to every rejection so the
/// caller can point at the offending construct without re-parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Offender {
    pub token: String,
    pub line: usize,
}

impl Offender {
    pub fn new(token: impl Into<String>, line: usize) -> Self {
        Self {
            token: token.into(),
            line,
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("source is {0} bytes, exceeds the 20 KB cap")]
    TooLarge(usize),

    #[error("nesting depth {0} exceeds the cap of 8")]
    NestingTooDeep(usize),

    #[error("loop count {0} exceeds the cap of 20")]
    TooManyLoops(usize),

    #[error("failed to parse source as Python: syntax error near line {0}")]
    ParseFailed(usize),

    #[error("schema violation: {0} at line {1}")]
    Schema(String, usize),

    #[error("banned symbol '{0}' at line {1}")]
    BannedSymbol(String, usize),

    #[error("shape violation: {0} at line {1}")]
    Shape(String, usize),
}

impl ValidatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidatorError::TooLarge(_) => ErrorKind::TooLarge,
            ValidatorError::NestingTooDeep(_) | ValidatorError::TooManyLoops(_) => {
                ErrorKind::Shape
            }
            ValidatorError::ParseFailed(_) => ErrorKind::Schema,
            ValidatorError::Schema(_, _) => ErrorKind::Schema,
            ValidatorError::BannedSymbol(_, _) => ErrorKind::BannedSymbol,
            ValidatorError::Shape(_, _) => ErrorKind::Shape,
        }
    }
}

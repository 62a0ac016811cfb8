use thiserror::Error;

use crate::interpreter::InterpreterError;
use crate::operation::Operation;

#[derive(Error, Debug)]
pub enum PdfToolsError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Unexpected message target: {0}")]
    UnexpectedTarget(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Invalid paper size: {0}")]
    InvalidPaperSize(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No output produced by {0}")]
    NoOutput(Operation),

    #[error("{operation} failed: {message}")]
    OperationFailed {
        operation: Operation,
        message: String,
    },

    #[error("Output sequence {pattern} exceeded {limit} files")]
    OutputLimitExceeded { pattern: String, limit: usize },

    #[error("Interpreter error: {0}")]
    Interpreter(#[from] InterpreterError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PdfToolsError {
    fn from(err: serde_json::Error) -> Self {
        PdfToolsError::SerializationError(err.to_string())
    }
}

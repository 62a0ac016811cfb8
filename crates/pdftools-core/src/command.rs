//! Request/response messages exchanged with a worker context
//!
//! In process, buffers are moved as owned `Vec<u8>`. Serialized with
//! `serde_json` they become plain numeric arrays, which matches the shape
//! the browser front end used.

use serde::{Deserialize, Serialize};

use crate::arguments::InputFile;
use crate::error::PdfToolsError;
use crate::operation::{Operation, Quality};

/// Envelope target the worker accepts
pub const WORKER_TARGET: &str = "wasm";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub target: String,
    pub data: TaskRequest,
}

impl Envelope {
    pub fn new(data: TaskRequest) -> Self {
        Self {
            target: WORKER_TARGET.to_string(),
            data,
        }
    }

    pub fn is_for_worker(&self) -> bool {
        self.target == WORKER_TARGET
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "operation",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum TaskRequest {
    Compress {
        file_data: Vec<u8>,
        #[serde(default)]
        quality: Quality,
    },
    Merge {
        files_data: Vec<InputFile>,
        #[serde(default = "default_true")]
        enable_compression: bool,
        #[serde(default)]
        quality: Quality,
    },
    Split {
        file_data: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    ExtractPages {
        file_data: Vec<u8>,
        first_page: i64,
        last_page: i64,
    },
    Grayscale {
        file_data: Vec<u8>,
    },
    Resize {
        file_data: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paper_size: Option<String>,
    },
    GetPageCount {
        file_data: Vec<u8>,
    },
}

impl TaskRequest {
    pub fn operation(&self) -> Operation {
        match self {
            TaskRequest::Compress { .. } => Operation::Compress,
            TaskRequest::Merge { .. } => Operation::Merge,
            TaskRequest::Split { .. } => Operation::Split,
            TaskRequest::ExtractPages { .. } => Operation::ExtractPages,
            TaskRequest::Grayscale { .. } => Operation::Grayscale,
            TaskRequest::Resize { .. } => Operation::Resize,
            TaskRequest::GetPageCount { .. } => Operation::GetPageCount,
        }
    }

    /// Total bytes carried by the request
    pub fn payload_size(&self) -> usize {
        match self {
            TaskRequest::Merge { files_data, .. } => files_data.iter().map(|f| f.data.len()).sum(),
            TaskRequest::Compress { file_data, .. }
            | TaskRequest::Split { file_data, .. }
            | TaskRequest::ExtractPages { file_data, .. }
            | TaskRequest::Grayscale { file_data }
            | TaskRequest::Resize { file_data, .. }
            | TaskRequest::GetPageCount { file_data } => file_data.len(),
        }
    }
}

/// Parse a raw JSON envelope, rejecting unknown targets and operations
/// before attempting a typed decode
pub fn parse_envelope(json: &str) -> Result<Envelope, PdfToolsError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    let target = value
        .get("target")
        .and_then(|t| t.as_str())
        .ok_or_else(|| PdfToolsError::SerializationError("Missing message target".into()))?;
    if target != WORKER_TARGET {
        return Err(PdfToolsError::UnexpectedTarget(target.to_string()));
    }

    let operation = value
        .get("data")
        .and_then(|d| d.get("operation"))
        .ok_or_else(|| PdfToolsError::SerializationError("Missing operation".into()))?;
    match operation.as_str() {
        Some(name) => {
            name.parse::<Operation>()?;
        }
        None => return Err(PdfToolsError::UnsupportedOperation(operation.to_string())),
    }

    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl OutputFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<OutputFile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResponse {
    pub fn with_outputs(operation: Operation, outputs: Vec<OutputFile>) -> Self {
        Self {
            operation,
            outputs: Some(outputs),
            page_count: None,
            error: None,
        }
    }

    pub fn with_page_count(page_count: u32) -> Self {
        Self {
            operation: Operation::GetPageCount,
            outputs: None,
            page_count: Some(page_count),
            error: None,
        }
    }

    pub fn page_count_unknown(error: impl Into<String>) -> Self {
        Self {
            operation: Operation::GetPageCount,
            outputs: None,
            page_count: None,
            error: Some(error.into()),
        }
    }

    pub fn outputs(&self) -> &[OutputFile] {
        self.outputs.as_deref().unwrap_or_default()
    }

    /// Outputs of a successful run; an empty list is a failure
    pub fn into_outputs(self) -> Result<Vec<OutputFile>, PdfToolsError> {
        if let Some(message) = self.error {
            return Err(PdfToolsError::OperationFailed {
                operation: self.operation,
                message,
            });
        }
        match self.outputs {
            Some(outputs) if !outputs.is_empty() => Ok(outputs),
            _ => Err(PdfToolsError::NoOutput(self.operation)),
        }
    }

    /// Page count of a successful probe
    pub fn into_page_count(self) -> Result<u32, PdfToolsError> {
        match (self.page_count, self.error) {
            (Some(count), _) => Ok(count),
            (None, Some(message)) => Err(PdfToolsError::OperationFailed {
                operation: self.operation,
                message,
            }),
            (None, None) => Err(PdfToolsError::NoOutput(self.operation)),
        }
    }
}

//! Operation dispatcher
//!
//! Maps a typed [`TaskRequest`] onto an argument template and output
//! descriptor, validates its parameters, and drives the [`TaskRunner`].

use crate::arguments::{
    compress_args, extract_args, grayscale_args, merge_args, merge_input_name, page_count_args,
    resize_args, split_args, ArgumentList, InputFile, OutputDescriptor, COMPRESS_OUTPUT,
    EXTRACT_OUTPUT, GRAYSCALE_OUTPUT, INPUT_NAME, MERGE_OUTPUT, RESIZE_OUTPUT, SPLIT_OUTPUT,
};
use crate::command::{TaskRequest, TaskResponse};
use crate::error::PdfToolsError;
use crate::harvest::HarvestLimits;
use crate::interpreter::Interpreter;
use crate::operation::{Operation, PageRange, PaperSize};
use crate::runner::TaskRunner;

pub const PAGE_COUNT_ERROR: &str = "Could not determine page count";

/// Everything needed to run one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Produces files that are harvested afterwards
    Files {
        operation: Operation,
        inputs: Vec<InputFile>,
        args: ArgumentList,
        output: OutputDescriptor,
    },
    /// Answers on stdout
    Probe {
        inputs: Vec<InputFile>,
        args: ArgumentList,
    },
}

impl Invocation {
    pub fn args(&self) -> &ArgumentList {
        match self {
            Invocation::Files { args, .. } | Invocation::Probe { args, .. } => args,
        }
    }

    pub fn inputs(&self) -> &[InputFile] {
        match self {
            Invocation::Files { inputs, .. } | Invocation::Probe { inputs, .. } => inputs,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    limits: HarvestLimits,
}

impl Dispatcher {
    pub fn new(limits: HarvestLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> HarvestLimits {
        self.limits
    }

    /// Build the invocation for a request without running anything
    pub fn plan(&self, request: TaskRequest) -> Result<Invocation, PdfToolsError> {
        let single = |data: Vec<u8>| vec![InputFile::new(INPUT_NAME, data)];

        let invocation = match request {
            TaskRequest::Compress { file_data, quality } => Invocation::Files {
                operation: Operation::Compress,
                inputs: single(file_data),
                args: compress_args(quality),
                output: OutputDescriptor::literal(COMPRESS_OUTPUT),
            },
            TaskRequest::Merge {
                files_data,
                enable_compression,
                quality,
            } => {
                if files_data.is_empty() {
                    return Err(PdfToolsError::InvalidRequest(
                        "Merge requires at least one input file".into(),
                    ));
                }
                let inputs: Vec<InputFile> = files_data
                    .into_iter()
                    .enumerate()
                    .map(|(index, file)| {
                        tracing::debug!("Merge input {} is {}", index, file.name);
                        InputFile::new(merge_input_name(index), file.data)
                    })
                    .collect();
                let names: Vec<String> = inputs.iter().map(|f| f.name.clone()).collect();
                Invocation::Files {
                    operation: Operation::Merge,
                    inputs,
                    args: merge_args(&names, enable_compression.then_some(quality)),
                    output: OutputDescriptor::literal(MERGE_OUTPUT),
                }
            }
            TaskRequest::Split { file_data, .. } => Invocation::Files {
                operation: Operation::Split,
                inputs: single(file_data),
                args: split_args(),
                output: OutputDescriptor::from_pattern(SPLIT_OUTPUT)?,
            },
            TaskRequest::ExtractPages {
                file_data,
                first_page,
                last_page,
            } => {
                let range = PageRange::new(first_page, last_page)?;
                Invocation::Files {
                    operation: Operation::ExtractPages,
                    inputs: single(file_data),
                    args: extract_args(range),
                    output: OutputDescriptor::literal(EXTRACT_OUTPUT),
                }
            }
            TaskRequest::Grayscale { file_data } => Invocation::Files {
                operation: Operation::Grayscale,
                inputs: single(file_data),
                args: grayscale_args(),
                output: OutputDescriptor::literal(GRAYSCALE_OUTPUT),
            },
            TaskRequest::Resize {
                file_data,
                paper_size,
            } => {
                let paper = match paper_size.as_deref() {
                    Some(token) if !token.trim().is_empty() => PaperSize::parse(token)?,
                    _ => PaperSize::default(),
                };
                Invocation::Files {
                    operation: Operation::Resize,
                    inputs: single(file_data),
                    args: resize_args(paper),
                    output: OutputDescriptor::literal(RESIZE_OUTPUT),
                }
            }
            TaskRequest::GetPageCount { file_data } => Invocation::Probe {
                inputs: single(file_data),
                args: page_count_args(),
            },
        };

        Ok(invocation)
    }

    /// Plan and run a request against the given interpreter handle
    pub async fn dispatch(
        &self,
        interpreter: &mut dyn Interpreter,
        request: TaskRequest,
    ) -> Result<TaskResponse, PdfToolsError> {
        let operation = request.operation();
        tracing::info!(
            "Dispatching {} ({} input bytes)",
            operation,
            request.payload_size()
        );

        let mut runner = TaskRunner::new(interpreter, self.limits);
        match self.plan(request)? {
            Invocation::Files {
                operation,
                inputs,
                args,
                output,
            } => {
                let outputs = runner.run(&inputs, &args, &output).await?;
                tracing::info!("{} produced {} output(s)", operation, outputs.len());
                Ok(TaskResponse::with_outputs(operation, outputs))
            }
            Invocation::Probe { inputs, args } => {
                let text = runner.run_capture(&inputs, &args).await?;
                Ok(match parse_page_count(&text) {
                    Some(count) => TaskResponse::with_page_count(count),
                    None => TaskResponse::page_count_unknown(PAGE_COUNT_ERROR),
                })
            }
        }
    }
}

/// Leading integer of the trimmed output, if positive
pub fn parse_page_count(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..digits_end]
        .parse::<u32>()
        .ok()
        .filter(|count| *count > 0)
}

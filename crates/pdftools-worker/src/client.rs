//! Client proxy
//!
//! Every call runs in a fresh [`WorkerContext`]: read the input files, post
//! exactly one envelope, take the first event, tear the context down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pdftools_core::{
    parse_envelope, Dispatcher, Envelope, InputFile, Interpreter, OutputFile, PdfToolsError,
    Quality, TaskRequest, TaskResponse,
};
use thiserror::Error;

use crate::abort::AbortSignal;
use crate::config::WorkerConfig;
use crate::context::{ContextError, InterpreterFactory, WorkerContext, WorkerEvent};
use crate::ghostscript::GhostscriptProcess;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation aborted")]
    Aborted,

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Worker(#[from] PdfToolsError),
}

impl ClientError {
    pub fn is_abort(&self) -> bool {
        matches!(self, ClientError::Aborted)
    }
}

#[derive(Clone)]
pub struct PdfToolsClient {
    factory: InterpreterFactory,
    dispatcher: Dispatcher,
}

impl PdfToolsClient {
    pub fn new(factory: InterpreterFactory, dispatcher: Dispatcher) -> Self {
        Self {
            factory,
            dispatcher,
        }
    }

    /// Client whose contexts run the configured Ghostscript binary
    pub fn from_config(config: &WorkerConfig) -> Self {
        let interpreter = config.interpreter.clone();
        let factory: InterpreterFactory = Arc::new(move || {
            GhostscriptProcess::from_config(&interpreter)
                .map(|gs| Box::new(gs) as Box<dyn Interpreter>)
        });
        Self::new(factory, Dispatcher::new(config.harvest_limits()))
    }

    pub async fn compress(
        &self,
        path: impl AsRef<Path>,
        quality: Quality,
    ) -> Result<Vec<OutputFile>, ClientError> {
        let file_data = read_input(path.as_ref()).await?;
        self.run_files(TaskRequest::Compress { file_data, quality })
            .await
    }

    /// Inputs are merged in the order given
    pub async fn merge<P: AsRef<Path>>(
        &self,
        paths: &[P],
        enable_compression: bool,
        quality: Quality,
    ) -> Result<Vec<OutputFile>, ClientError> {
        let mut files_data = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let data = read_input(path).await?;
            files_data.push(InputFile::new(file_name(path), data));
        }
        self.run_files(TaskRequest::Merge {
            files_data,
            enable_compression,
            quality,
        })
        .await
    }

    /// One output per page, in page order
    pub async fn split(&self, path: impl AsRef<Path>) -> Result<Vec<OutputFile>, ClientError> {
        let path = path.as_ref();
        let file_data = read_input(path).await?;
        self.run_files(TaskRequest::Split {
            file_data,
            file_name: Some(file_name(path)),
        })
        .await
    }

    pub async fn extract_pages(
        &self,
        path: impl AsRef<Path>,
        first_page: i64,
        last_page: i64,
    ) -> Result<Vec<OutputFile>, ClientError> {
        let file_data = read_input(path.as_ref()).await?;
        self.run_files(TaskRequest::ExtractPages {
            file_data,
            first_page,
            last_page,
        })
        .await
    }

    pub async fn grayscale(&self, path: impl AsRef<Path>) -> Result<Vec<OutputFile>, ClientError> {
        let file_data = read_input(path.as_ref()).await?;
        self.run_files(TaskRequest::Grayscale { file_data }).await
    }

    /// `paper_size` defaults to a4
    pub async fn resize(
        &self,
        path: impl AsRef<Path>,
        paper_size: Option<&str>,
    ) -> Result<Vec<OutputFile>, ClientError> {
        let file_data = read_input(path.as_ref()).await?;
        self.run_files(TaskRequest::Resize {
            file_data,
            paper_size: paper_size.map(String::from),
        })
        .await
    }

    /// Page count of a document, abandoned as soon as `signal` fires
    pub async fn get_page_count(
        &self,
        path: impl AsRef<Path>,
        signal: Option<&AbortSignal>,
    ) -> Result<u32, ClientError> {
        if signal.is_some_and(AbortSignal::is_aborted) {
            return Err(ClientError::Aborted);
        }
        let file_data = read_input(path.as_ref()).await?;
        let response = self
            .execute(Envelope::new(TaskRequest::GetPageCount { file_data }), signal)
            .await?;
        Ok(response.into_page_count()?)
    }

    pub async fn run_operation(&self, request: TaskRequest) -> Result<TaskResponse, ClientError> {
        self.execute(Envelope::new(request), None).await
    }

    /// Run a raw JSON envelope as received from an untyped caller
    pub async fn run_json(&self, json: &str) -> Result<TaskResponse, ClientError> {
        let envelope = parse_envelope(json)?;
        self.execute(envelope, None).await
    }

    async fn run_files(&self, request: TaskRequest) -> Result<Vec<OutputFile>, ClientError> {
        Ok(self.run_operation(request).await?.into_outputs()?)
    }

    async fn execute(
        &self,
        envelope: Envelope,
        signal: Option<&AbortSignal>,
    ) -> Result<TaskResponse, ClientError> {
        let operation = envelope.data.operation();
        let mut context = WorkerContext::spawn(self.factory.clone(), self.dispatcher);
        context.post_message(envelope)?;

        let event = match signal {
            Some(signal) => {
                let raced = tokio::select! {
                    biased;
                    _ = signal.aborted() => None,
                    event = context.recv() => Some(event),
                };
                match raced {
                    Some(event) => event,
                    None => {
                        context.terminate();
                        tracing::info!("{} aborted", operation);
                        return Err(ClientError::Aborted);
                    }
                }
            }
            None => context.recv().await,
        };
        context.shutdown_deferred();

        match event? {
            WorkerEvent::Message(response) => Ok(response),
            WorkerEvent::Error(e) => Err(ClientError::Worker(e)),
        }
    }
}

async fn read_input(path: &Path) -> Result<Vec<u8>, ClientError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::ReadInput {
            path: path.to_path_buf(),
            source,
        })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

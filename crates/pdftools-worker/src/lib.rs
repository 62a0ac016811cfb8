//! Worker layer for pdftools
//!
//! Runs each request in an isolated context that owns a Ghostscript
//! interpreter, and exposes a promise-style client over it.

pub mod abort;
pub mod client;
pub mod config;
pub mod context;
pub mod ghostscript;

pub use abort::{AbortController, AbortSignal};
pub use client::{ClientError, PdfToolsClient};
pub use config::WorkerConfig;
pub use context::{ContextError, InterpreterFactory, WorkerContext, WorkerEvent};
pub use ghostscript::GhostscriptProcess;

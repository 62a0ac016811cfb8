//! PDF operations dispatched to an external interpreter
//!
//! This crate does no PDF processing of its own. It maps each operation to a
//! fixed Ghostscript argument template, stages inputs into the interpreter's
//! virtual filesystem, runs it, and harvests the files it produced.
//!
//! - [`dispatch::Dispatcher`]: request → arguments + output descriptor
//! - [`runner::TaskRunner`]: stage → invoke → harvest → clean up
//! - [`interpreter::Interpreter`]: the seam to the engine itself

pub mod arguments;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod harvest;
pub mod interpreter;
pub mod naming;
pub mod operation;
pub mod runner;

pub use arguments::{ArgumentList, InputFile, NumberedPattern, OutputDescriptor};
pub use command::{parse_envelope, Envelope, OutputFile, TaskRequest, TaskResponse, WORKER_TARGET};
pub use dispatch::{Dispatcher, Invocation};
pub use error::PdfToolsError;
pub use harvest::HarvestLimits;
pub use interpreter::{Interpreter, InterpreterError, MemoryFs, MemoryInterpreter, PrintSink};
pub use operation::{Operation, PageRange, PaperSize, Quality};
pub use runner::TaskRunner;

/// Format bytes as human-readable string
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Size reduction in whole percent; negative when the output grew
pub fn savings_percent(original: usize, result: usize) -> i64 {
    if original == 0 {
        return 0;
    }
    ((1.0 - result as f64 / original as f64) * 100.0).round() as i64
}

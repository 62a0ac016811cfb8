//! Task runner: stage inputs, invoke, harvest, clean up
//!
//! Within one run the phases are strictly ordered. The interpreter handle
//! is borrowed for the duration of the run and never stored.

use crate::arguments::{ArgumentList, InputFile, OutputDescriptor};
use crate::command::OutputFile;
use crate::error::PdfToolsError;
use crate::harvest::{harvest, HarvestLimits};
use crate::interpreter::{Interpreter, InterpreterError, PrintSink};

/// Forwards interpreter output to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl PrintSink for LogSink {
    fn stdout(&mut self, line: &str) {
        tracing::debug!("GS: {}", line);
    }

    fn stderr(&mut self, line: &str) {
        tracing::warn!("GS Error: {}", line);
    }
}

/// Collects stdout for operations that answer in text
#[derive(Debug, Default)]
pub struct CaptureSink {
    captured: String,
}

impl CaptureSink {
    pub fn into_text(self) -> String {
        self.captured
    }
}

impl PrintSink for CaptureSink {
    fn stdout(&mut self, line: &str) {
        tracing::debug!("GS PageCount: {}", line);
        self.captured.push_str(line);
        self.captured.push('\n');
    }

    fn stderr(&mut self, line: &str) {
        tracing::warn!("GS PageCount Error: {}", line);
    }
}

pub struct TaskRunner<'a> {
    interpreter: &'a mut dyn Interpreter,
    limits: HarvestLimits,
}

impl<'a> TaskRunner<'a> {
    pub fn new(interpreter: &'a mut dyn Interpreter, limits: HarvestLimits) -> Self {
        Self {
            interpreter,
            limits,
        }
    }

    /// Run a file-producing invocation and return its harvested outputs
    ///
    /// Whatever the outcome, staged inputs and every file the descriptor
    /// could name are gone afterwards, and stale targets from an earlier
    /// run are removed before this one starts.
    pub async fn run(
        &mut self,
        inputs: &[InputFile],
        args: &ArgumentList,
        output: &OutputDescriptor,
    ) -> Result<Vec<OutputFile>, PdfToolsError> {
        self.clear_outputs(output);

        let result = self.stage_and_harvest(inputs, args, output).await;

        self.clean_up(inputs);
        self.clear_outputs(output);
        result
    }

    /// Run an invocation whose answer is printed to stdout
    pub async fn run_capture(
        &mut self,
        inputs: &[InputFile],
        args: &ArgumentList,
    ) -> Result<String, PdfToolsError> {
        let mut sink = CaptureSink::default();
        let result = match self.stage(inputs) {
            Ok(()) => self.invoke(args, &mut sink).await,
            Err(e) => Err(e),
        };

        self.clean_up(inputs);
        result.map(|_| sink.into_text())
    }

    async fn stage_and_harvest(
        &mut self,
        inputs: &[InputFile],
        args: &ArgumentList,
        output: &OutputDescriptor,
    ) -> Result<Vec<OutputFile>, PdfToolsError> {
        self.stage(inputs)?;
        self.invoke(args, &mut LogSink).await?;
        harvest(&*self.interpreter, output, self.limits)
    }

    fn stage(&mut self, inputs: &[InputFile]) -> Result<(), PdfToolsError> {
        for file in inputs {
            self.interpreter.write_file(&file.name, &file.data)?;
            tracing::debug!("Staged {} ({} bytes)", file.name, file.data.len());
        }
        Ok(())
    }

    async fn invoke(
        &mut self,
        args: &ArgumentList,
        sink: &mut dyn PrintSink,
    ) -> Result<(), PdfToolsError> {
        tracing::debug!("Invoking interpreter with {:?}", args.as_slice());
        let code = self.interpreter.call_main(args.as_slice(), sink).await?;
        if code != 0 {
            tracing::warn!("Interpreter exited with code {}", code);
        }
        Ok(())
    }

    fn clean_up(&mut self, inputs: &[InputFile]) {
        for file in inputs {
            self.remove(&file.name);
        }
    }

    /// Remove every file the descriptor could refer to, including numbered
    /// files past a gap in the sequence
    fn clear_outputs(&mut self, output: &OutputDescriptor) {
        match output {
            OutputDescriptor::Literal(name) => self.remove(name),
            OutputDescriptor::Numbered(pattern) => {
                let names = match self.interpreter.list_files() {
                    Ok(names) => names,
                    Err(e) => {
                        tracing::warn!("Could not list files to clear {}: {}", pattern, e);
                        return;
                    }
                };
                for name in names.iter().filter(|name| pattern.matches(name)) {
                    self.remove(name);
                }
            }
        }
    }

    fn remove(&mut self, name: &str) {
        match self.interpreter.remove_file(name) {
            Ok(()) | Err(InterpreterError::FileNotFound(_)) => {}
            Err(e) => tracing::debug!("Could not remove {}: {}", name, e),
        }
    }
}

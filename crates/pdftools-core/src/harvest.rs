//! Reading results back out of the virtual filesystem

use crate::arguments::{NumberedPattern, OutputDescriptor};
use crate::command::OutputFile;
use crate::error::PdfToolsError;
use crate::interpreter::Interpreter;

/// Hard ceiling on numbered output sequences
pub const DEFAULT_MAX_NUMBERED_OUTPUTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestLimits {
    pub max_numbered_outputs: usize,
}

impl Default for HarvestLimits {
    fn default() -> Self {
        Self {
            max_numbered_outputs: DEFAULT_MAX_NUMBERED_OUTPUTS,
        }
    }
}

pub fn harvest(
    interpreter: &dyn Interpreter,
    descriptor: &OutputDescriptor,
    limits: HarvestLimits,
) -> Result<Vec<OutputFile>, PdfToolsError> {
    match descriptor {
        OutputDescriptor::Literal(name) => Ok(harvest_literal(interpreter, name)),
        OutputDescriptor::Numbered(pattern) => harvest_numbered(interpreter, pattern, limits),
    }
}

/// A missing literal output is not fatal here; the caller sees zero outputs
fn harvest_literal(interpreter: &dyn Interpreter, name: &str) -> Vec<OutputFile> {
    match interpreter.read_file(name) {
        Ok(data) => vec![OutputFile::new(name, data)],
        Err(e) => {
            tracing::warn!("Error reading output file {}: {}", name, e);
            Vec::new()
        }
    }
}

/// Reads index 1, 2, ... until the first miss
fn harvest_numbered(
    interpreter: &dyn Interpreter,
    pattern: &NumberedPattern,
    limits: HarvestLimits,
) -> Result<Vec<OutputFile>, PdfToolsError> {
    let mut outputs = Vec::new();

    for index in 1.. {
        let name = pattern.render(index);
        let data = match interpreter.read_file(&name) {
            Ok(data) => data,
            Err(_) => break,
        };

        if outputs.len() == limits.max_numbered_outputs {
            return Err(PdfToolsError::OutputLimitExceeded {
                pattern: pattern.to_string(),
                limit: limits.max_numbered_outputs,
            });
        }
        outputs.push(OutputFile::new(name, data));
    }

    tracing::debug!("Harvested {} files matching {}", outputs.len(), pattern);
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::SPLIT_OUTPUT;
    use crate::interpreter::{InterpreterError, MemoryInterpreter, PrintSink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads to check the probing pattern
    struct CountingInterpreter {
        inner: MemoryInterpreter,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl Interpreter for CountingInterpreter {
        fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), InterpreterError> {
            self.inner.write_file(name, data)
        }

        fn read_file(&self, name: &str) -> Result<Vec<u8>, InterpreterError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read_file(name)
        }

        fn remove_file(&mut self, name: &str) -> Result<(), InterpreterError> {
            self.inner.remove_file(name)
        }

        fn list_files(&self) -> Result<Vec<String>, InterpreterError> {
            self.inner.list_files()
        }

        async fn call_main(
            &mut self,
            args: &[String],
            sink: &mut dyn PrintSink,
        ) -> Result<i32, InterpreterError> {
            self.inner.call_main(args, sink).await
        }
    }

    fn with_pages(count: usize) -> CountingInterpreter {
        let mut inner = MemoryInterpreter::new(|_, _, _| 0);
        let pattern = NumberedPattern::parse(SPLIT_OUTPUT).unwrap();
        for i in 1..=count {
            inner
                .write_file(&pattern.render(i), format!("page {}", i).as_bytes())
                .unwrap();
        }
        CountingInterpreter {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_numbered_harvest_reads_n_plus_one() {
        let interp = with_pages(3);
        let descriptor = OutputDescriptor::from_pattern(SPLIT_OUTPUT).unwrap();
        let outputs = harvest(&interp, &descriptor, HarvestLimits::default()).unwrap();

        let names: Vec<_> = outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["page_0001.pdf", "page_0002.pdf", "page_0003.pdf"]);
        assert_eq!(outputs[1].data, b"page 2");
        assert_eq!(interp.reads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_numbered_harvest_with_no_files() {
        let interp = with_pages(0);
        let descriptor = OutputDescriptor::from_pattern(SPLIT_OUTPUT).unwrap();
        let outputs = harvest(&interp, &descriptor, HarvestLimits::default()).unwrap();
        assert!(outputs.is_empty());
        assert_eq!(interp.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_numbered_harvest_stops_at_gap() {
        let mut interp = with_pages(5);
        interp.remove_file("page_0003.pdf").unwrap();
        let descriptor = OutputDescriptor::from_pattern(SPLIT_OUTPUT).unwrap();
        let outputs = harvest(&interp, &descriptor, HarvestLimits::default()).unwrap();
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn test_numbered_harvest_ceiling() {
        let interp = with_pages(6);
        let descriptor = OutputDescriptor::from_pattern(SPLIT_OUTPUT).unwrap();
        let limits = HarvestLimits {
            max_numbered_outputs: 5,
        };
        let err = harvest(&interp, &descriptor, limits).unwrap_err();
        assert!(matches!(
            err,
            PdfToolsError::OutputLimitExceeded { limit: 5, .. }
        ));
    }

    #[test]
    fn test_numbered_harvest_exactly_at_ceiling() {
        let interp = with_pages(5);
        let descriptor = OutputDescriptor::from_pattern(SPLIT_OUTPUT).unwrap();
        let limits = HarvestLimits {
            max_numbered_outputs: 5,
        };
        assert_eq!(harvest(&interp, &descriptor, limits).unwrap().len(), 5);
    }

    #[test]
    fn test_missing_literal_yields_no_outputs() {
        let interp = with_pages(0);
        let outputs = harvest(
            &interp,
            &OutputDescriptor::literal("output.pdf"),
            HarvestLimits::default(),
        )
        .unwrap();
        assert!(outputs.is_empty());
    }
}

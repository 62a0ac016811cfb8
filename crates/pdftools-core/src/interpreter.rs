//! The interpreter seam
//!
//! The PDF engine is an opaque capability: a flat virtual filesystem plus a
//! `call_main` entry point that takes command-line-style arguments. Output
//! lines are pushed into a [`PrintSink`] as they appear.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterpreterError {
    #[error("File not found in virtual filesystem: {0}")]
    FileNotFound(String),

    #[error("Invalid virtual path: {0}")]
    InvalidPath(String),

    #[error("Failed to start interpreter: {0}")]
    Spawn(String),

    #[error("Interpreter timed out after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives interpreter output line by line
pub trait PrintSink: Send {
    fn stdout(&mut self, line: &str);
    fn stderr(&mut self, line: &str);
}

/// A single-owner handle to a loaded interpreter
///
/// `&mut self` on every method means one invocation at a time per handle.
#[async_trait]
pub trait Interpreter: Send {
    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), InterpreterError>;

    fn read_file(&self, name: &str) -> Result<Vec<u8>, InterpreterError>;

    fn remove_file(&mut self, name: &str) -> Result<(), InterpreterError>;

    /// Names of every file currently in the virtual filesystem
    fn list_files(&self) -> Result<Vec<String>, InterpreterError>;

    /// Run the interpreter to completion and return its exit code
    async fn call_main(
        &mut self,
        args: &[String],
        sink: &mut dyn PrintSink,
    ) -> Result<i32, InterpreterError>;
}

/// Reject anything that is not a plain file name
pub fn validate_name(name: &str) -> Result<(), InterpreterError> {
    if name.is_empty() {
        return Err(InterpreterError::InvalidPath("empty file name".to_string()));
    }
    if name.contains("..") {
        return Err(InterpreterError::InvalidPath(format!(
            "path traversal with '..' is not allowed: {}",
            name
        )));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(InterpreterError::InvalidPath(format!(
            "virtual file names must be flat: {}",
            name
        )));
    }
    Ok(())
}

/// Flat in-memory file namespace
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<(), InterpreterError> {
        validate_name(name)?;
        self.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, InterpreterError> {
        validate_name(name)?;
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| InterpreterError::FileNotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<(), InterpreterError> {
        validate_name(name)?;
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| InterpreterError::FileNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

type Behavior =
    Box<dyn FnMut(&[String], &mut MemoryFs, &mut dyn PrintSink) -> i32 + Send + 'static>;

/// Interpreter whose `call_main` is a closure over an in-memory filesystem
///
/// Used wherever a real engine is unavailable or undesirable, mostly tests.
pub struct MemoryInterpreter {
    fs: MemoryFs,
    behavior: Behavior,
    calls: Vec<Vec<String>>,
}

impl MemoryInterpreter {
    pub fn new<F>(behavior: F) -> Self
    where
        F: FnMut(&[String], &mut MemoryFs, &mut dyn PrintSink) -> i32 + Send + 'static,
    {
        Self {
            fs: MemoryFs::new(),
            behavior: Box::new(behavior),
            calls: Vec::new(),
        }
    }

    pub fn fs(&self) -> &MemoryFs {
        &self.fs
    }

    /// Argument lists of every invocation so far, oldest first
    pub fn calls(&self) -> &[Vec<String>] {
        &self.calls
    }
}

impl std::fmt::Debug for MemoryInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryInterpreter")
            .field("fs", &self.fs)
            .field("calls", &self.calls.len())
            .finish()
    }
}

#[async_trait]
impl Interpreter for MemoryInterpreter {
    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), InterpreterError> {
        self.fs.write(name, data)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, InterpreterError> {
        self.fs.read(name)
    }

    fn remove_file(&mut self, name: &str) -> Result<(), InterpreterError> {
        self.fs.remove(name)
    }

    fn list_files(&self) -> Result<Vec<String>, InterpreterError> {
        Ok(self.fs.names().map(String::from).collect())
    }

    async fn call_main(
        &mut self,
        args: &[String],
        sink: &mut dyn PrintSink,
    ) -> Result<i32, InterpreterError> {
        self.calls.push(args.to_vec());
        Ok((self.behavior)(args, &mut self.fs, sink))
    }
}

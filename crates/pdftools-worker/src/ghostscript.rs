//! Ghostscript as an external process
//!
//! Each instance owns a scratch directory that plays the role of the
//! interpreter's virtual filesystem. `call_main` runs the binary with that
//! directory as its working directory, so relative names in the argument
//! templates resolve inside it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use pdftools_core::interpreter::validate_name;
use pdftools_core::{Interpreter, InterpreterError, PrintSink};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::InterpreterConfig;

#[derive(Debug)]
pub struct GhostscriptProcess {
    binary: PathBuf,
    timeout: Option<Duration>,
    dir: TempDir,
}

impl GhostscriptProcess {
    pub fn new(binary: impl Into<PathBuf>, timeout: Option<Duration>) -> Result<Self, InterpreterError> {
        let dir = tempfile::Builder::new().prefix("pdftools-").tempdir()?;
        let binary = binary.into();
        tracing::debug!(
            "Ghostscript {} using scratch dir {}",
            binary.display(),
            dir.path().display()
        );
        Ok(Self {
            binary,
            timeout,
            dir,
        })
    }

    pub fn from_config(config: &InterpreterConfig) -> Result<Self, InterpreterError> {
        Self::new(config.binary.clone(), config.timeout())
    }

    /// Directory backing the virtual filesystem
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, InterpreterError> {
        validate_name(name)?;
        Ok(self.dir.path().join(name))
    }
}

fn not_found(name: &str, err: std::io::Error) -> InterpreterError {
    if err.kind() == ErrorKind::NotFound {
        InterpreterError::FileNotFound(name.to_string())
    } else {
        InterpreterError::Io(err)
    }
}

#[async_trait]
impl Interpreter for GhostscriptProcess {
    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), InterpreterError> {
        let path = self.resolve(name)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, InterpreterError> {
        let path = self.resolve(name)?;
        std::fs::read(path).map_err(|e| not_found(name, e))
    }

    fn remove_file(&mut self, name: &str) -> Result<(), InterpreterError> {
        let path = self.resolve(name)?;
        std::fs::remove_file(path).map_err(|e| not_found(name, e))
    }

    fn list_files(&self) -> Result<Vec<String>, InterpreterError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.dir.path())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn call_main(
        &mut self,
        args: &[String],
        sink: &mut dyn PrintSink,
    ) -> Result<i32, InterpreterError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(self.dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                InterpreterError::Spawn(format!("{}: {}", self.binary.display(), e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InterpreterError::Spawn("stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| InterpreterError::Spawn("stderr was not captured".into()))?;

        let run = async {
            let mut out = BufReader::new(stdout).lines();
            let mut err = BufReader::new(stderr).lines();
            let mut out_open = true;
            let mut err_open = true;

            while out_open || err_open {
                tokio::select! {
                    line = out.next_line(), if out_open => match line? {
                        Some(line) => sink.stdout(&line),
                        None => out_open = false,
                    },
                    line = err.next_line(), if err_open => match line? {
                        Some(line) => sink.stderr(&line),
                        None => err_open = false,
                    },
                }
            }

            let status = child.wait().await?;
            // Killed by a signal
            Ok::<i32, InterpreterError>(status.code().unwrap_or(-1))
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| InterpreterError::Timeout(limit.as_millis() as u64))?,
            None => run.await,
        }
    }
}

//! Argument templates for the interpreter
//!
//! Each operation maps to a fixed, ordered argument list. The interpreter
//! consumes arguments positionally, so order is part of the contract.

use serde::{Deserialize, Serialize};

use crate::error::PdfToolsError;
use crate::operation::{PageRange, PaperSize, Quality};

pub const INPUT_NAME: &str = "input.pdf";
pub const COMPRESS_OUTPUT: &str = "output.pdf";
pub const MERGE_OUTPUT: &str = "merged.pdf";
pub const SPLIT_OUTPUT: &str = "page_%04d.pdf";
pub const EXTRACT_OUTPUT: &str = "extracted.pdf";
pub const GRAYSCALE_OUTPUT: &str = "grayscale.pdf";
pub const RESIZE_OUTPUT: &str = "resized.pdf";

const OUTPUT_DIRECTIVE: &str = "-sOutputFile=";
const PAGE_COUNT_PROGRAM: &str = "(input.pdf) (r) file runpdfbegin pdfpagecount = quit";

/// A file staged into the virtual filesystem before invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Virtual name for the merge input at `index`
pub fn merge_input_name(index: usize) -> String {
    format!("input{}.pdf", index)
}

/// Ordered command-line arguments for one interpreter run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList(Vec<String>);

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: impl Into<String>) -> &mut Self {
        self.0.push(arg.into());
        self
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Values of every `-sOutputFile=` directive, in order
    pub fn output_files(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|arg| arg.strip_prefix(OUTPUT_DIRECTIVE))
            .collect()
    }

    /// Arguments that are not flags: the input references
    pub fn positional(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|arg| !arg.starts_with('-'))
            .map(String::as_str)
            .collect()
    }

    fn pdfwrite() -> Self {
        let mut args = Self::new();
        args.push("-sDEVICE=pdfwrite")
            .push("-dCompatibilityLevel=1.4");
        args
    }

    fn batch(&mut self) -> &mut Self {
        self.push("-dNOPAUSE").push("-dQUIET").push("-dBATCH")
    }

    fn output(&mut self, name: &str) -> &mut Self {
        self.push(format!("{}{}", OUTPUT_DIRECTIVE, name))
    }
}

impl IntoIterator for ArgumentList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

pub fn compress_args(quality: Quality) -> ArgumentList {
    let mut args = ArgumentList::pdfwrite();
    args.push(format!("-dPDFSETTINGS={}", quality.preset()))
        .batch()
        .output(COMPRESS_OUTPUT)
        .push(INPUT_NAME);
    args
}

/// Inputs are appended in caller order after the output directive
pub fn merge_args(input_names: &[String], compression: Option<Quality>) -> ArgumentList {
    let mut args = ArgumentList::pdfwrite();
    args.batch().output(MERGE_OUTPUT);
    if let Some(quality) = compression {
        args.push(format!("-dPDFSETTINGS={}", quality.preset()));
    }
    for name in input_names {
        args.push(name.as_str());
    }
    args
}

pub fn split_args() -> ArgumentList {
    let mut args = ArgumentList::pdfwrite();
    args.batch().output(SPLIT_OUTPUT).push(INPUT_NAME);
    args
}

pub fn extract_args(range: PageRange) -> ArgumentList {
    let mut args = ArgumentList::pdfwrite();
    args.push(format!("-dFirstPage={}", range.first()))
        .push(format!("-dLastPage={}", range.last()))
        .batch()
        .output(EXTRACT_OUTPUT)
        .push(INPUT_NAME);
    args
}

pub fn grayscale_args() -> ArgumentList {
    let mut args = ArgumentList::pdfwrite();
    args.push("-sColorConversionStrategy=Gray")
        .push("-dProcessColorModel=/DeviceGray")
        .batch()
        .output(GRAYSCALE_OUTPUT)
        .push(INPUT_NAME);
    args
}

pub fn resize_args(paper: PaperSize) -> ArgumentList {
    let mut args = ArgumentList::pdfwrite();
    args.push("-dFIXEDMEDIA")
        .push("-dPDFFitPage")
        .push(format!("-sPAPERSIZE={}", paper))
        .batch()
        .output(RESIZE_OUTPUT)
        .push(INPUT_NAME);
    args
}

/// Runs a PostScript snippet that prints the page count of `input.pdf`
pub fn page_count_args() -> ArgumentList {
    let mut args = ArgumentList::new();
    args.push("-dNODISPLAY")
        .push("-dNOPAUSE")
        .push("-dBATCH")
        .push("-q")
        .push("-c")
        .push(PAGE_COUNT_PROGRAM);
    args
}

/// A file name template with one `%d` / `%0Nd` index placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedPattern {
    prefix: String,
    suffix: String,
    width: usize,
}

impl NumberedPattern {
    pub fn parse(pattern: &str) -> Result<Self, PdfToolsError> {
        let start = pattern.find('%').ok_or_else(|| {
            PdfToolsError::InvalidRequest(format!("No index placeholder in {}", pattern))
        })?;
        let rest = &pattern[start + 1..];
        let end = rest.find('d').ok_or_else(|| {
            PdfToolsError::InvalidRequest(format!("Unterminated placeholder in {}", pattern))
        })?;
        let flags = &rest[..end];

        let width = if flags.is_empty() {
            0
        } else if let Some(digits) = flags.strip_prefix('0') {
            digits.parse().map_err(|_| {
                PdfToolsError::InvalidRequest(format!("Bad placeholder width in {}", pattern))
            })?
        } else {
            return Err(PdfToolsError::InvalidRequest(format!(
                "Only zero-padded placeholders are supported: {}",
                pattern
            )));
        };

        Ok(Self {
            prefix: pattern[..start].to_string(),
            suffix: rest[end + 1..].to_string(),
            width,
        })
    }

    /// Whether `name` is some rendering of this pattern
    pub fn matches(&self, name: &str) -> bool {
        let Some(index) = name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_suffix(self.suffix.as_str()))
        else {
            return false;
        };
        !index.is_empty() && index.len() >= self.width && index.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn render(&self, index: usize) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }
}

impl std::fmt::Display for NumberedPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.width == 0 {
            write!(f, "{}%d{}", self.prefix, self.suffix)
        } else {
            write!(f, "{}%0{}d{}", self.prefix, self.width, self.suffix)
        }
    }
}

/// What to read back from the virtual filesystem after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDescriptor {
    Literal(String),
    Numbered(NumberedPattern),
}

impl OutputDescriptor {
    pub fn literal(name: &str) -> Self {
        OutputDescriptor::Literal(name.to_string())
    }

    /// Builds a numbered descriptor when the name holds a placeholder
    pub fn from_pattern(pattern: &str) -> Result<Self, PdfToolsError> {
        if pattern.contains('%') {
            Ok(OutputDescriptor::Numbered(NumberedPattern::parse(pattern)?))
        } else {
            Ok(OutputDescriptor::literal(pattern))
        }
    }

    pub fn is_numbered(&self) -> bool {
        matches!(self, OutputDescriptor::Numbered(_))
    }
}

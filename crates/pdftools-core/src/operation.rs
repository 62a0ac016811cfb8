//! Operation names and the typed parameters the argument templates consume

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PdfToolsError;

/// The seven operations the dispatcher knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Compress,
    Merge,
    Split,
    ExtractPages,
    Grayscale,
    Resize,
    GetPageCount,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Compress,
        Operation::Merge,
        Operation::Split,
        Operation::ExtractPages,
        Operation::Grayscale,
        Operation::Resize,
        Operation::GetPageCount,
    ];

    /// Wire name used in request and response messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Compress => "compress",
            Operation::Merge => "merge",
            Operation::Split => "split",
            Operation::ExtractPages => "extractPages",
            Operation::Grayscale => "grayscale",
            Operation::Resize => "resize",
            Operation::GetPageCount => "getPageCount",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = PdfToolsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| PdfToolsError::UnsupportedOperation(s.to_string()))
    }
}

/// Output quality preset passed to the interpreter as `-dPDFSETTINGS`
///
/// Levels 1-4 select a preset. Anything else (0, 5, null, strings, ...)
/// resolves to [`Quality::Ebook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    Screen,
    #[default]
    Ebook,
    Printer,
    Prepress,
}

impl Quality {
    pub fn from_level(level: i64) -> Self {
        match level {
            1 => Quality::Screen,
            2 => Quality::Ebook,
            3 => Quality::Printer,
            4 => Quality::Prepress,
            _ => Quality::Ebook,
        }
    }

    /// Resolve a loosely-typed wire value. Integral numbers map by level.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(level) = n.as_i64() {
                    Quality::from_level(level)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && (1.0..=4.0).contains(&f) => {
                            Quality::from_level(f as i64)
                        }
                        _ => Quality::Ebook,
                    }
                }
            }
            _ => Quality::Ebook,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Quality::Screen => 1,
            Quality::Ebook => 2,
            Quality::Printer => 3,
            Quality::Prepress => 4,
        }
    }

    /// Ghostscript preset name, including the leading slash
    pub fn preset(&self) -> &'static str {
        match self {
            Quality::Screen => "/screen",
            Quality::Ebook => "/ebook",
            Quality::Printer => "/printer",
            Quality::Prepress => "/prepress",
        }
    }
}

impl Serialize for Quality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Quality::from_value(&value))
    }
}

const PAPER_SIZES: &[&str] = &[
    "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8", "a9", "a10", "b0", "b1", "b2", "b3",
    "b4", "b5", "b6", "c0", "c1", "c2", "c3", "c4", "c5", "c6", "archA", "archB", "archC",
    "archD", "archE", "letter", "lettersmall", "legal", "ledger", "11x17", "halfletter", "note",
];

/// A paper size token the interpreter recognises for `-sPAPERSIZE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaperSize(&'static str);

impl PaperSize {
    pub const A4: PaperSize = PaperSize("a4");

    /// Match a token case-insensitively against the known sizes
    pub fn parse(token: &str) -> Result<Self, PdfToolsError> {
        let token = token.trim();
        PAPER_SIZES
            .iter()
            .find(|known| known.eq_ignore_ascii_case(token))
            .copied()
            .map(PaperSize)
            .ok_or_else(|| PdfToolsError::InvalidPaperSize(token.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn known() -> &'static [&'static str] {
        PAPER_SIZES
    }
}

impl Default for PaperSize {
    fn default() -> Self {
        PaperSize::A4
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// 1-based inclusive page range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    first: u32,
    last: u32,
}

impl PageRange {
    pub fn new(first: i64, last: i64) -> Result<Self, PdfToolsError> {
        if first < 1 {
            return Err(PdfToolsError::InvalidRange(format!(
                "First page must be >= 1, got {}",
                first
            )));
        }
        if last < first {
            return Err(PdfToolsError::InvalidRange(format!(
                "Last page {} is before first page {}",
                last, first
            )));
        }
        let first = u32::try_from(first)
            .map_err(|_| PdfToolsError::InvalidRange(format!("First page {} is too large", first)))?;
        let last = u32::try_from(last)
            .map_err(|_| PdfToolsError::InvalidRange(format!("Last page {} is too large", last)))?;
        Ok(Self { first, last })
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn is_single(&self) -> bool {
        self.first == self.last
    }
}

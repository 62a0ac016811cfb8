//! File names for results saved by a front end

use chrono::NaiveDateTime;

use crate::operation::{PageRange, PaperSize};

/// File name without a trailing `.pdf` (case-insensitive)
pub fn stem(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4
        && file_name.is_char_boundary(len - 4)
        && file_name[len - 4..].eq_ignore_ascii_case(".pdf")
    {
        &file_name[..len - 4]
    } else {
        file_name
    }
}

pub fn compressed_name(source: &str) -> String {
    format!("{}-compressed.pdf", stem(source))
}

pub fn grayscale_name(source: &str) -> String {
    format!("{}_gray.pdf", stem(source))
}

pub fn resized_name(source: &str, paper: PaperSize) -> String {
    format!("{}_{}.pdf", stem(source), paper)
}

pub fn extracted_name(source: &str, range: PageRange) -> String {
    if range.is_single() {
        format!("{}_page_{}.pdf", stem(source), range.first())
    } else {
        format!(
            "{}_pages_{}-{}.pdf",
            stem(source),
            range.first(),
            range.last()
        )
    }
}

/// Name for page `index` (0-based) of `total`, padded to the width of `total`
pub fn split_page_name(source: &str, index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("{}-p{:0width$}.pdf", stem(source), index + 1, width = width)
}

/// Archive holding every page of a split
pub fn split_archive_name(source: &str) -> String {
    format!("{}_pages.zip", stem(source))
}

/// `[<prefix>-]merge_<YYYYMMDD_HHMMSS>.pdf`
///
/// The prefix is the longest common prefix of the input names, kept only
/// when it is made of letters, digits and underscores.
pub fn merged_name<S: AsRef<str>>(sources: &[S], timestamp: NaiveDateTime) -> String {
    let prefix = common_prefix(sources);
    let valid = !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    let base = if valid {
        format!("{}-merge", prefix)
    } else {
        "merge".to_string()
    };
    format!("{}_{}.pdf", base, timestamp.format("%Y%m%d_%H%M%S"))
}

fn common_prefix<S: AsRef<str>>(sources: &[S]) -> &str {
    let Some(first) = sources.first().map(|s| s.as_ref()) else {
        return "";
    };
    let mut end = first.len();
    for other in &sources[1..] {
        let other = other.as_ref();
        end = first
            .char_indices()
            .zip(other.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, a), _)| i + a.len_utf8())
            .unwrap_or(0)
            .min(end);
    }
    &first[..end]
}

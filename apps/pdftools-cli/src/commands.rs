//! One function per subcommand: run the operation, then save its outputs
//! under the names a user would expect.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pdftools_core::naming;
use pdftools_core::{format_bytes, savings_percent, OutputFile, PageRange, PaperSize, Quality};
use pdftools_worker::{AbortController, ClientError, PdfToolsClient};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// How long an extraction with an explicit last page waits for the page count
pub const PAGE_COUNT_WAIT: Duration = Duration::from_secs(5);

pub async fn compress(
    client: &PdfToolsClient,
    file: &Path,
    level: i64,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let quality = Quality::from_level(level);
    let outputs = client.compress(file, quality).await?;
    let original = input_size(file).await?;

    let output = single(outputs)?;
    let saved = save(out_dir, &naming::compressed_name(&source_name(file)), &output).await?;
    println!(
        "{} ({}) -> {} ({}), {}% smaller",
        file.display(),
        format_bytes(original),
        saved.display(),
        format_bytes(output.data.len()),
        savings_percent(original, output.data.len())
    );
    Ok(())
}

pub async fn merge(
    client: &PdfToolsClient,
    files: &[PathBuf],
    compress: bool,
    level: i64,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let outputs = client
        .merge(files, compress, Quality::from_level(level))
        .await?;
    let names: Vec<String> = files.iter().map(|f| source_name(f)).collect();

    let output = single(outputs)?;
    let name = naming::merged_name(&names, chrono::Local::now().naive_local());
    let saved = save(out_dir, &name, &output).await?;
    println!(
        "Merged {} files -> {} ({})",
        files.len(),
        saved.display(),
        format_bytes(output.data.len())
    );
    Ok(())
}

/// With `zip`, the pages go into one `<stem>_pages.zip` instead of separate files
pub async fn split(
    client: &PdfToolsClient,
    file: &Path,
    zip: bool,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let outputs = client.split(file).await?;
    let source = source_name(file);
    let total = outputs.len();

    if zip {
        let archive = archive_pages(&source, &outputs)?;
        let saved = save_bytes(out_dir, &naming::split_archive_name(&source), &archive).await?;
        println!("{} ({})", saved.display(), format_bytes(archive.len()));
    } else {
        for (index, output) in outputs.iter().enumerate() {
            let name = naming::split_page_name(&source, index, total);
            let saved = save(out_dir, &name, output).await?;
            println!("{} ({})", saved.display(), format_bytes(output.data.len()));
        }
    }
    println!("Split {} into {} pages", file.display(), total);
    Ok(())
}

/// Extract `first..=last`, checked against the document's page count.
///
/// Without `last` the range runs to the final page. A `last` past the end is
/// clamped. When `last` is given the count is optional: if it fails or takes
/// longer than `wait`, it is abandoned and the range goes through unchecked.
pub async fn extract(
    client: &PdfToolsClient,
    file: &Path,
    first: i64,
    last: Option<i64>,
    wait: Duration,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let count = count_for_range(client, file, last.is_none(), wait).await?;
    let last = match (last, count) {
        (Some(last), Some(count)) => last.min(i64::from(count)),
        (Some(last), None) => last,
        (None, Some(count)) => i64::from(count),
        (None, None) => anyhow::bail!("Could not count pages of {}", file.display()),
    };
    if let Some(count) = count {
        if first > i64::from(count) {
            anyhow::bail!(
                "First page {} is past the end of {} ({} pages)",
                first,
                file.display(),
                count
            );
        }
    }

    let range = PageRange::new(first, last)?;
    let outputs = client.extract_pages(file, first, last).await?;

    let output = single(outputs)?;
    let name = naming::extracted_name(&source_name(file), range);
    let saved = save(out_dir, &name, &output).await?;
    println!("{} ({})", saved.display(), format_bytes(output.data.len()));
    Ok(())
}

async fn count_for_range(
    client: &PdfToolsClient,
    file: &Path,
    required: bool,
    wait: Duration,
) -> anyhow::Result<Option<u32>> {
    let controller = AbortController::new();
    let signal = controller.signal();
    let counting = client.get_page_count(file, Some(&signal));
    tokio::pin!(counting);

    if required {
        let count = counting
            .await
            .with_context(|| format!("Could not count pages of {}", file.display()))?;
        return Ok(Some(count));
    }

    tokio::select! {
        result = &mut counting => match result {
            Ok(count) => Ok(Some(count)),
            Err(e) => {
                tracing::warn!("Extracting without a page count for {}: {}", file.display(), e);
                Ok(None)
            }
        },
        _ = tokio::time::sleep(wait) => {
            controller.abort();
            match counting.await {
                Ok(count) => Ok(Some(count)),
                Err(e) => {
                    tracing::debug!("Page count of {} abandoned: {}", file.display(), e);
                    Ok(None)
                }
            }
        }
    }
}

pub async fn grayscale(client: &PdfToolsClient, file: &Path, out_dir: &Path) -> anyhow::Result<()> {
    let output = single(client.grayscale(file).await?)?;
    let saved = save(out_dir, &naming::grayscale_name(&source_name(file)), &output).await?;
    println!("{} ({})", saved.display(), format_bytes(output.data.len()));
    Ok(())
}

pub async fn resize(
    client: &PdfToolsClient,
    file: &Path,
    paper: &str,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let outputs = client.resize(file, Some(paper)).await?;
    let paper = PaperSize::parse(paper)?;

    let output = single(outputs)?;
    let saved = save(out_dir, &naming::resized_name(&source_name(file), paper), &output).await?;
    println!("{} ({})", saved.display(), format_bytes(output.data.len()));
    Ok(())
}

/// Ctrl-C cancels the count
pub async fn page_count(client: &PdfToolsClient, file: &Path) -> anyhow::Result<()> {
    let controller = AbortController::new();
    let signal = controller.signal();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            controller.abort();
        }
    });

    let result = client.get_page_count(file, Some(&signal)).await;
    watcher.abort();
    report_count(file, result)
}

fn report_count(file: &Path, result: Result<u32, ClientError>) -> anyhow::Result<()> {
    match result {
        Ok(count) => {
            println!("{}", count);
            Ok(())
        }
        Err(e) if e.is_abort() => {
            tracing::warn!("Page count of {} cancelled", file.display());
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Could not count pages of {}", file.display())),
    }
}

fn archive_pages(source: &str, outputs: &[OutputFile]) -> anyhow::Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let total = outputs.len();
    for (index, output) in outputs.iter().enumerate() {
        writer.start_file(naming::split_page_name(source, index, total), options)?;
        writer.write_all(&output.data)?;
    }
    Ok(writer.finish()?.into_inner())
}

fn single(outputs: Vec<OutputFile>) -> anyhow::Result<OutputFile> {
    outputs
        .into_iter()
        .next()
        .context("Operation produced no output")
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}

async fn input_size(path: &Path) -> anyhow::Result<usize> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(metadata.len() as usize)
}

async fn save(out_dir: &Path, name: &str, output: &OutputFile) -> anyhow::Result<PathBuf> {
    let path = save_bytes(out_dir, name, &output.data).await?;
    tracing::debug!("Saved {} as {}", output.name, path.display());
    Ok(path)
}

async fn save_bytes(out_dir: &Path, name: &str, data: &[u8]) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = out_dir.join(name);
    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

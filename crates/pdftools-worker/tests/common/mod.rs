//! Shared fixtures: real PDFs built with lopdf and interpreters that act on them

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};
use pdftools_core::{
    Dispatcher, Interpreter, InterpreterError, MemoryFs, MemoryInterpreter, NumberedPattern,
    PrintSink,
};
use pdftools_worker::{InterpreterFactory, PdfToolsClient};
use tempfile::TempDir;

/// Build a PDF with `num_pages` pages, each showing "Page N"
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

/// Copy of `pdf` holding only pages `first..=last`
fn keep_pages(pdf: &[u8], first: u32, last: u32) -> Option<Vec<u8>> {
    let mut doc = Document::load_mem(pdf).ok()?;
    let total = doc.get_pages().len() as u32;
    let mut drop: Vec<u32> = (1..=total).filter(|p| *p < first || *p > last).collect();
    drop.reverse();
    for page in drop {
        doc.delete_pages(&[page]);
    }
    doc.prune_objects();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).ok()?;
    Some(buffer)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .find_map(|arg| arg.strip_prefix(flag))
        .map(str::to_string)
}

/// Stand-in for Ghostscript that honours the parts of its command line the
/// worker relies on: page counting, split into numbered files, page ranges,
/// and merging in argument order.
pub fn fake_ghostscript(args: &[String], fs: &mut MemoryFs, sink: &mut dyn PrintSink) -> i32 {
    if args.iter().any(|a| a == "-dNODISPLAY") {
        return match fs.read("input.pdf").ok().and_then(|pdf| Document::load_mem(&pdf).ok()) {
            Some(doc) => {
                sink.stdout(&doc.get_pages().len().to_string());
                0
            }
            None => {
                sink.stderr("Error: /syntaxerror in pdfpagecount");
                1
            }
        };
    }

    let Some(output) = flag_value(args, "-sOutputFile=") else {
        sink.stderr("no output file");
        return 1;
    };
    let inputs: Vec<Vec<u8>> = args
        .iter()
        .filter(|a| !a.starts_with('-'))
        .filter_map(|name| fs.read(name).ok())
        .collect();
    let Some(first_input) = inputs.first() else {
        sink.stderr("no input");
        return 1;
    };

    if output.contains('%') {
        let pattern = NumberedPattern::parse(&output).unwrap();
        let total = page_count(first_input) as u32;
        for page in 1..=total {
            let single = keep_pages(first_input, page, page).unwrap();
            fs.write(&pattern.render(page as usize), &single).unwrap();
        }
        return 0;
    }

    let first = flag_value(args, "-dFirstPage=").map(|v| v.parse::<u32>().unwrap());
    let last = flag_value(args, "-dLastPage=").map(|v| v.parse::<u32>().unwrap());
    if let (Some(first), Some(last)) = (first, last) {
        let total = page_count(first_input) as u32;
        if first > total {
            sink.stderr("No pages will be processed (FirstPage > total pages)");
            return 0;
        }
        let kept = keep_pages(first_input, first, last.min(total)).unwrap();
        fs.write(&output, &kept).unwrap();
        return 0;
    }

    let merged: Vec<u8> = inputs.concat();
    fs.write(&output, &merged).unwrap();
    0
}

pub fn fake_factory() -> InterpreterFactory {
    Arc::new(|| Ok(Box::new(MemoryInterpreter::new(fake_ghostscript)) as Box<dyn Interpreter>))
}

pub fn fake_client() -> PdfToolsClient {
    PdfToolsClient::new(fake_factory(), Dispatcher::default())
}

/// Interpreter that takes a long time and records whether it ever finished
pub struct SlowInterpreter {
    fs: MemoryFs,
    delay: Duration,
    completed: Arc<AtomicBool>,
}

impl SlowInterpreter {
    pub fn factory(delay: Duration, completed: Arc<AtomicBool>) -> InterpreterFactory {
        Arc::new(move || {
            Ok(Box::new(SlowInterpreter {
                fs: MemoryFs::new(),
                delay,
                completed: completed.clone(),
            }) as Box<dyn Interpreter>)
        })
    }
}

#[async_trait]
impl Interpreter for SlowInterpreter {
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
        _args: &[String],
        sink: &mut dyn PrintSink,
    ) -> Result<i32, InterpreterError> {
        tokio::time::sleep(self.delay).await;
        sink.stdout("9");
        self.completed.store(true, Ordering::SeqCst);
        Ok(0)
    }
}

/// Write fixtures into a scratch directory that lives as long as the guard
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn pdf(&self, name: &str, pages: u32) -> PathBuf {
        self.file(name, &create_test_pdf(pages))
    }

    pub fn file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }
}

//! End-to-end client flows against interpreters that operate on real PDFs

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{fake_client, page_count, Fixtures, SlowInterpreter};
use pdftools_core::{
    Dispatcher, Interpreter, MemoryInterpreter, Operation, PdfToolsError, Quality, TaskRequest,
};
use pdftools_worker::{
    AbortController, ClientError, ContextError, InterpreterFactory, PdfToolsClient,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[tokio::test]
async fn compress_returns_one_output() {
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("report.pdf", 2);

    let outputs = fake_client().compress(&input, Quality::Screen).await.unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].name, "output.pdf");
    assert_eq!(page_count(&outputs[0].data), 2);
}

#[tokio::test]
async fn split_three_pages_returns_three_ordered_outputs() {
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("three.pdf", 3);

    let outputs = fake_client().split(&input).await.unwrap();

    let names: Vec<&str> = outputs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["page_0001.pdf", "page_0002.pdf", "page_0003.pdf"]);
    for output in &outputs {
        assert_eq!(page_count(&output.data), 1);
    }
}

#[tokio::test]
async fn merge_preserves_caller_order() {
    let fixtures = Fixtures::new();
    let a = fixtures.file("a.pdf", b"AAA");
    let b = fixtures.file("b.pdf", b"BB");
    let c = fixtures.file("c.pdf", b"C");

    let outputs = fake_client()
        .merge(&[c, a, b], false, Quality::Ebook)
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].name, "merged.pdf");
    assert_eq!(outputs[0].data, b"CAAABB".to_vec());
}

#[tokio::test]
async fn page_count_of_real_document() {
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("five.pdf", 5);

    let count = fake_client().get_page_count(&input, None).await.unwrap();
    assert_eq!(count, 5);
}

#[tokio::test]
async fn page_count_of_garbage_fails() {
    let fixtures = Fixtures::new();
    let input = fixtures.file("broken.pdf", b"not a pdf");

    let err = fake_client().get_page_count(&input, None).await.unwrap_err();
    match err {
        ClientError::Worker(PdfToolsError::OperationFailed { operation, message }) => {
            assert_eq!(operation, Operation::GetPageCount);
            assert_eq!(message, "Could not determine page count");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn extract_past_end_of_document_has_no_output() {
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("two.pdf", 2);

    let err = fake_client().extract_pages(&input, 5, 6).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Worker(PdfToolsError::NoOutput(Operation::ExtractPages))
    ));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_interpreter() {
    let invoked = Arc::new(AtomicBool::new(false));
    let spy = invoked.clone();
    let factory: InterpreterFactory = Arc::new(move || {
        let spy = spy.clone();
        Ok(Box::new(MemoryInterpreter::new(move |_, _, _| {
            spy.store(true, Ordering::SeqCst);
            0
        })) as Box<dyn Interpreter>)
    });
    let client = PdfToolsClient::new(factory, Dispatcher::default());
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("doc.pdf", 1);

    let err = client.extract_pages(&input, 3, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Worker(PdfToolsError::InvalidRange(_))));

    let err = client.resize(&input, Some("napkin")).await.unwrap_err();
    assert!(matches!(err, ClientError::Worker(PdfToolsError::InvalidPaperSize(_))));

    let err = client.merge::<&str>(&[], true, Quality::Ebook).await.unwrap_err();
    assert!(matches!(err, ClientError::Worker(PdfToolsError::InvalidRequest(_))));

    assert!(!invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn unknown_operation_rejects() {
    let err = fake_client()
        .run_json(r#"{"target":"wasm","data":{"operation":"foo","fileData":[1,2,3]}}"#)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Worker(PdfToolsError::UnsupportedOperation(_))
    ));
    assert!(err.to_string().to_lowercase().contains("unsupported operation"));
}

#[tokio::test]
async fn run_operation_returns_raw_response() {
    let response = fake_client()
        .run_operation(TaskRequest::GetPageCount {
            file_data: common::create_test_pdf(4),
        })
        .await
        .unwrap();

    assert_eq!(response.operation, Operation::GetPageCount);
    assert_eq!(response.page_count, Some(4));
    assert_eq!(response.error, None);
}

#[tokio::test]
async fn crashing_context_rejects() {
    let factory: InterpreterFactory = Arc::new(|| {
        Ok(Box::new(MemoryInterpreter::new(|_, _, _| -> i32 {
            panic!("interpreter trap: unreachable")
        })) as Box<dyn Interpreter>)
    });
    let client = PdfToolsClient::new(factory, Dispatcher::default());
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("doc.pdf", 1);

    let err = client.grayscale(&input).await.unwrap_err();
    match err {
        ClientError::Context(ContextError::Crashed(message)) => {
            assert!(message.contains("unreachable"))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// ============================================================
// Cancellation
// ============================================================

#[tokio::test]
async fn abort_during_page_count_discards_response() {
    let completed = Arc::new(AtomicBool::new(false));
    let client = PdfToolsClient::new(
        SlowInterpreter::factory(Duration::from_millis(300), completed.clone()),
        Dispatcher::default(),
    );
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("big.pdf", 3);

    let controller = AbortController::new();
    let signal = controller.signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.abort();
    });

    let err = client
        .get_page_count(&input, Some(&signal))
        .await
        .unwrap_err();
    assert!(err.is_abort());

    // The context was torn down, so the interpreter never gets to finish
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!completed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn page_count_completes_when_signal_never_fires() {
    let completed = Arc::new(AtomicBool::new(false));
    let client = PdfToolsClient::new(
        SlowInterpreter::factory(Duration::from_millis(10), completed.clone()),
        Dispatcher::default(),
    );
    let fixtures = Fixtures::new();
    let input = fixtures.pdf("doc.pdf", 1);

    let controller = AbortController::new();
    let count = client
        .get_page_count(&input, Some(&controller.signal()))
        .await
        .unwrap();

    assert_eq!(count, 9);
    assert!(completed.load(Ordering::SeqCst));
}

// ============================================================
// Range invariant on real documents
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn extracted_page_count_matches_range(first in 1i64..=6, span in 0i64..6) {
        let last = (first + span).min(6);
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fixtures = Fixtures::new();
        let input = fixtures.pdf("six.pdf", 6);

        let outputs = runtime
            .block_on(fake_client().extract_pages(&input, first, last))
            .unwrap();

        prop_assert_eq!(outputs.len(), 1);
        prop_assert_eq!(page_count(&outputs[0].data) as i64, last - first + 1);
    }
}

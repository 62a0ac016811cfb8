//! Isolated execution context
//!
//! A context is a single tokio task that owns its interpreter. The only way
//! in is an [`Envelope`] on the inbox; the only way out is a [`WorkerEvent`].
//! Nothing else is shared, so a context that panics or is torn down takes
//! its interpreter (and any running process) with it.

use std::any::Any;
use std::sync::Arc;

use pdftools_core::{
    Dispatcher, Envelope, Interpreter, InterpreterError, PdfToolsError, TaskRequest, TaskResponse,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Creates the interpreter on a context's first message
pub type InterpreterFactory =
    Arc<dyn Fn() -> Result<Box<dyn Interpreter>, InterpreterError> + Send + Sync>;

#[derive(Debug)]
pub enum WorkerEvent {
    Message(TaskResponse),
    Error(PdfToolsError),
}

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Worker context crashed: {0}")]
    Crashed(String),

    #[error("Worker context closed without responding")]
    Closed,
}

pub struct WorkerContext {
    inbox: Option<mpsc::UnboundedSender<Envelope>>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerContext {
    pub fn spawn(factory: InterpreterFactory, dispatcher: Dispatcher) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(inbox_rx, events_tx, factory, dispatcher));
        Self {
            inbox: Some(inbox_tx),
            events: events_rx,
            handle: Some(handle),
        }
    }

    pub fn post_message(&self, envelope: Envelope) -> Result<(), ContextError> {
        self.inbox
            .as_ref()
            .ok_or(ContextError::Closed)?
            .send(envelope)
            .map_err(|_| ContextError::Closed)
    }

    /// Next event from the context
    ///
    /// If the context ends without emitting one, reports whether it
    /// panicked or simply closed.
    pub async fn recv(&mut self) -> Result<WorkerEvent, ContextError> {
        if let Some(event) = self.events.recv().await {
            return Ok(event);
        }
        let Some(handle) = self.handle.take() else {
            return Err(ContextError::Closed);
        };
        match handle.await {
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                tracing::error!("Worker context crashed: {}", message);
                Err(ContextError::Crashed(message))
            }
            _ => Err(ContextError::Closed),
        }
    }

    /// Tear down immediately, killing any invocation in flight
    pub fn terminate(&mut self) {
        self.inbox = None;
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Worker context terminated");
        }
    }

    /// Tear down after the current scheduling turn
    pub fn shutdown_deferred(mut self) {
        self.inbox = None;
        if let Some(handle) = self.handle.take() {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                handle.abort();
            });
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for WorkerContext {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    events: mpsc::UnboundedSender<WorkerEvent>,
    factory: InterpreterFactory,
    dispatcher: Dispatcher,
) {
    let mut interpreter: Option<Box<dyn Interpreter>> = None;

    while let Some(envelope) = inbox.recv().await {
        if !envelope.is_for_worker() {
            tracing::debug!("Ignoring message for target {:?}", envelope.target);
            continue;
        }
        tracing::debug!("Worker received {}", envelope.data.operation());

        let event = match handle(&mut interpreter, &factory, dispatcher, envelope.data).await {
            Ok(response) => WorkerEvent::Message(response),
            Err(e) => {
                tracing::error!("Worker error: {}", e);
                WorkerEvent::Error(e)
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

async fn handle(
    slot: &mut Option<Box<dyn Interpreter>>,
    factory: &InterpreterFactory,
    dispatcher: Dispatcher,
    request: TaskRequest,
) -> Result<TaskResponse, PdfToolsError> {
    let interpreter = match slot.take() {
        Some(interpreter) => interpreter,
        None => {
            tracing::debug!("Loading interpreter");
            factory()?
        }
    };
    let interpreter = slot.insert(interpreter);
    dispatcher.dispatch(interpreter.as_mut(), request).await
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

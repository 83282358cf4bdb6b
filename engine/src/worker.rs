//! Runs graph generation off the caller's thread and streams progress back.
//!
//! One job per worker at a time: a submit while a job is in flight is rejected with
//! [`WorkerError::Busy`]. Events arrive in emission order and every job ends with
//! exactly one terminal event, [`GraphEvent::Completed`] or [`GraphEvent::Failed`].

use crate::graph::{generate_graph, Stage};
use crate::{Corpus, CorpusError, GraphData, WorkerError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphEvent {
    Progress { stage: Stage, percent: f64 },
    Completed { graph: GraphData },
    Failed { error: CorpusError },
}

impl GraphEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GraphEvent::Progress { .. })
    }
}

/// Untyped `{stage, value, data?}` view of an event. Only the completion report carries `data`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub stage: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<GraphData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<GraphEvent> for ProgressReport {
    fn from(event: GraphEvent) -> Self {
        match event {
            GraphEvent::Progress { stage, percent } => ProgressReport { stage: stage.to_string(), value: percent, data: None, error: None },
            GraphEvent::Completed { graph } => ProgressReport { stage: Stage::CreatingLinks.to_string(), value: 100.0, data: Some(graph), error: None },
            GraphEvent::Failed { error } => ProgressReport { stage: "Failed".into(), value: 100.0, data: None, error: Some(error.to_string()) },
        }
    }
}

#[derive(Clone, Default)]
pub struct GraphWorker {
    busy: Arc<Mutex<bool>>,
}

/// Clears the busy flag when the job thread is done with it, including on unwind.
struct BusyGuard(Arc<Mutex<bool>>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        *self.0.lock() = false;
    }
}

impl GraphWorker {
    pub fn new() -> Self { Self::default() }

    pub fn is_busy(&self) -> bool { *self.busy.lock() }

    /// Starts generating the graph for `corpus` on a dedicated thread.
    pub fn submit(&self, corpus: Arc<Corpus>) -> Result<GraphJob, WorkerError> {
        {
            let mut busy = self.busy.lock();
            if *busy {
                return Err(WorkerError::Busy);
            }
            *busy = true;
        }
        let guard = BusyGuard(self.busy.clone());
        let (tx, rx) = unbounded_channel();
        thread::Builder::new()
            .name("graph-worker".into())
            .spawn(move || {
                let started = Instant::now();
                tracing::info!(queries = corpus.num_queries(), "graph generation started");
                let terminal = match run(&corpus, &tx) {
                    Ok(graph) => {
                        tracing::info!(
                            nodes = graph.nodes.len(),
                            links = graph.links.len(),
                            took_s = started.elapsed().as_secs_f64(),
                            "graph generation finished"
                        );
                        GraphEvent::Completed { graph }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "graph generation aborted");
                        GraphEvent::Failed { error }
                    }
                };
                // free the worker before the caller can observe the terminal event
                drop(guard);
                let _ = tx.send(terminal);
            })?;
        Ok(GraphJob { rx })
    }
}

fn run(corpus: &Corpus, tx: &UnboundedSender<GraphEvent>) -> Result<GraphData, CorpusError> {
    generate_graph(corpus, |stage, percent| {
        let _ = tx.send(GraphEvent::Progress { stage, percent });
    })
}

/// Receiving end of one submitted computation.
pub struct GraphJob {
    rx: UnboundedReceiver<GraphEvent>,
}

impl GraphJob {
    /// Next event, or `None` once the job has ended.
    pub async fn recv(&mut self) -> Option<GraphEvent> { self.rx.recv().await }

    /// Blocking variant of [`GraphJob::recv`]. Must not be called from inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<GraphEvent> { self.rx.blocking_recv() }

    /// Drains the job, forwarding progress to `on_progress`, and returns its outcome.
    pub async fn wait(mut self, mut on_progress: impl FnMut(Stage, f64)) -> Result<GraphData, WorkerError> {
        while let Some(event) = self.recv().await {
            if let Some(outcome) = settle(event, &mut on_progress) {
                return outcome;
            }
        }
        Err(WorkerError::Disconnected)
    }

    pub fn wait_blocking(mut self, mut on_progress: impl FnMut(Stage, f64)) -> Result<GraphData, WorkerError> {
        while let Some(event) = self.blocking_recv() {
            if let Some(outcome) = settle(event, &mut on_progress) {
                return outcome;
            }
        }
        Err(WorkerError::Disconnected)
    }
}

fn settle(event: GraphEvent, on_progress: &mut impl FnMut(Stage, f64)) -> Option<Result<GraphData, WorkerError>> {
    match event {
        GraphEvent::Progress { stage, percent } => {
            on_progress(stage, percent);
            None
        }
        GraphEvent::Completed { graph } => Some(Ok(graph)),
        GraphEvent::Failed { error } => Some(Err(error.into())),
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asynchronous load/save of skill graphs against a [`GraphStore`].
//!
//! Requests are handed to a single worker thread running a current-thread
//! tokio runtime, so writes reach the store one at a time and in order.
//! Every request carries a version from one monotonic counter. A queued save
//! is dropped when a newer save for the same bot is queued behind it, and a
//! save waiting out a retry delay is abandoned for the same reason.
//!
//! Loads and saves share the queue, so a load always sees the saves queued
//! before it, including one still retrying.

mod retry;

pub use retry::RetryPolicy;

use crate::graph::{Graph, GraphDocument, GraphError};
use crate::store::{BotPath, GraphStore, StoreError};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Request sent to the worker
#[derive(Debug)]
enum StoreRequest {
    Load {
        version: u64,
        bot: BotPath,
    },
    Save {
        version: u64,
        bot: BotPath,
        graph_json: String,
    },
}

impl StoreRequest {
    fn is_save_for(&self, target: &BotPath) -> bool {
        matches!(self, Self::Save { bot, .. } if bot == target)
    }
}

/// Answer from the worker; exactly one per request
#[derive(Debug)]
pub enum StoreResponse {
    /// A load finished
    Loaded {
        /// Version of the load request
        version: u64,
        /// Decoded graph or the reason there is none
        result: Result<Graph, PersistenceError>,
    },
    /// A save finished
    Saved {
        /// Version of the save request
        version: u64,
        /// What happened to it
        outcome: SaveOutcome,
    },
}

/// Fate of a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the store
    Persisted {
        /// Attempts it took
        attempts: u32,
    },
    /// Dropped in favour of a newer save for the same bot
    Superseded,
    /// Gave up after retrying
    Failed {
        /// Attempts made
        attempts: u32,
        /// Last store error
        error: String,
    },
}

/// Something the user should be told about, without blocking them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceNotice {
    /// A save could not be written
    SaveFailed {
        /// Bot whose graph was not saved
        bot: BotPath,
        /// Version of the failed save
        version: u64,
        /// Attempts made
        attempts: u32,
        /// Last store error
        error: String,
    },
}

/// Snapshot of save progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    /// Version of the newest save handed to the worker
    pub last_requested: Option<u64>,
    /// Version of the newest save written to the store
    pub last_persisted: Option<u64>,
    /// Error of the most recent failed save, cleared by the next success
    pub last_error: Option<String>,
}

/// Errors of the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Store request failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Stored document is not valid JSON for a graph
    #[error("Malformed graph document: {0}")]
    Decode(#[from] serde_json::Error),

    /// Stored document breaks a graph invariant
    #[error("Invalid graph: {0}")]
    InvalidGraph(#[from] GraphError),

    /// Worker could not be started
    #[error("Failed to start persistence worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// Worker is gone
    #[error("Persistence worker stopped")]
    WorkerStopped,
}

impl PersistenceError {
    /// Whether the store simply has no graph for the bot yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound(_)))
    }
}

/// Decode a stored graph document
pub fn decode_graph(graph_json: &str) -> Result<Graph, PersistenceError> {
    let document: GraphDocument = serde_json::from_str(graph_json)?;
    Ok(Graph::try_from(document)?)
}

/// Encode a graph the way it is stored
pub fn encode_graph(graph: &Graph) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(graph)?)
}

/// Owns the persistence worker and tracks request versions
pub struct PersistenceBridge {
    request_tx: Option<mpsc::UnboundedSender<StoreRequest>>,
    response_rx: mpsc::UnboundedReceiver<StoreResponse>,
    worker: Option<JoinHandle<()>>,
    status: Arc<RwLock<SaveStatus>>,
    next_version: u64,
    latest_load: Option<u64>,
    pending_saves: usize,
    save_targets: VecDeque<(u64, BotPath)>,
    notices: Vec<PersistenceNotice>,
}

impl PersistenceBridge {
    /// Start a worker for `store`
    pub fn spawn<S: GraphStore>(store: S, retry: RetryPolicy) -> Result<Self, PersistenceError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let status = Arc::new(RwLock::new(SaveStatus::default()));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let worker_status = Arc::clone(&status);
        let worker = std::thread::Builder::new()
            .name("skill-graph-persistence".to_string())
            .spawn(move || {
                runtime.block_on(persistence_worker(
                    store,
                    retry,
                    request_rx,
                    response_tx,
                    worker_status,
                ));
            })?;

        Ok(Self {
            request_tx: Some(request_tx),
            response_rx,
            worker: Some(worker),
            status,
            next_version: 1,
            latest_load: None,
            pending_saves: 0,
            save_targets: VecDeque::new(),
            notices: Vec::new(),
        })
    }

    fn take_version(&mut self) -> u64 {
        let version = self.next_version;
        self.next_version += 1;
        version
    }

    fn send(&self, request: StoreRequest) -> Result<(), PersistenceError> {
        self.request_tx
            .as_ref()
            .ok_or(PersistenceError::WorkerStopped)?
            .send(request)
            .map_err(|_| PersistenceError::WorkerStopped)
    }

    /// Ask for the graph of `bot`. Any earlier load still in flight
    /// becomes stale.
    pub fn request_load(&mut self, bot: &BotPath) -> Result<u64, PersistenceError> {
        let version = self.take_version();
        self.send(StoreRequest::Load {
            version,
            bot: bot.clone(),
        })?;
        self.latest_load = Some(version);
        tracing::debug!("Requested graph load v{version} for {bot}");
        Ok(version)
    }

    /// Serialize `graph` and queue it for writing. Fire-and-forget: the
    /// outcome arrives later through [`Self::try_recv`].
    pub fn request_save(&mut self, bot: &BotPath, graph: &Graph) -> Result<u64, PersistenceError> {
        let graph_json = encode_graph(graph)?;
        let version = self.take_version();
        self.send(StoreRequest::Save {
            version,
            bot: bot.clone(),
            graph_json,
        })?;
        self.pending_saves += 1;
        self.save_targets.push_back((version, bot.clone()));
        self.status.write().last_requested = Some(version);
        tracing::debug!("Queued graph save v{version} for {bot}");
        Ok(version)
    }

    /// Version of the load whose answer is still awaited
    pub fn pending_load(&self) -> Option<u64> {
        self.latest_load
    }

    /// Number of saves without an answer yet
    pub fn pending_saves(&self) -> usize {
        self.pending_saves
    }

    /// Whether every request has been answered
    pub fn is_idle(&self) -> bool {
        self.latest_load.is_none() && self.pending_saves == 0
    }

    /// Current save progress
    pub fn status(&self) -> SaveStatus {
        self.status.read().clone()
    }

    /// Take the notices gathered so far
    pub fn drain_notices(&mut self) -> Vec<PersistenceNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Next answer if one is ready. Answers to superseded loads are
    /// swallowed here.
    pub fn try_recv(&mut self) -> Option<StoreResponse> {
        while let Ok(response) = self.response_rx.try_recv() {
            if let Some(response) = self.accept(response) {
                return Some(response);
            }
        }
        None
    }

    /// Block the calling thread until the next answer. Must not be called
    /// from inside an async runtime.
    pub fn recv_blocking(&mut self) -> Option<StoreResponse> {
        while let Some(response) = self.response_rx.blocking_recv() {
            if let Some(response) = self.accept(response) {
                return Some(response);
            }
        }
        None
    }

    fn accept(&mut self, response: StoreResponse) -> Option<StoreResponse> {
        match &response {
            StoreResponse::Loaded { version, .. } => {
                if self.latest_load != Some(*version) {
                    tracing::warn!("Discarding stale graph load v{version}");
                    return None;
                }
                self.latest_load = None;
            }
            StoreResponse::Saved { version, outcome } => {
                self.pending_saves = self.pending_saves.saturating_sub(1);
                let bot = self
                    .save_targets
                    .iter()
                    .position(|(v, _)| v == version)
                    .and_then(|i| self.save_targets.remove(i))
                    .map(|(_, bot)| bot);
                if let (SaveOutcome::Failed { attempts, error }, Some(bot)) = (outcome, bot) {
                    self.notices.push(PersistenceNotice::SaveFailed {
                        bot,
                        version: *version,
                        attempts: *attempts,
                        error: error.clone(),
                    });
                }
            }
        }
        Some(response)
    }

    /// Close the request channel and wait for the worker to finish the
    /// work already queued.
    pub fn shutdown(mut self) {
        self.request_tx = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Persistence worker panicked");
            }
        }
    }
}

/// Worker loop: runs until the bridge drops its sender and the queue is empty
async fn persistence_worker<S: GraphStore>(
    store: S,
    retry: RetryPolicy,
    mut request_rx: mpsc::UnboundedReceiver<StoreRequest>,
    response_tx: mpsc::UnboundedSender<StoreResponse>,
    status: Arc<RwLock<SaveStatus>>,
) {
    let mut queue = VecDeque::new();
    loop {
        if queue.is_empty() {
            match request_rx.recv().await {
                Some(request) => queue.push_back(request),
                None => break,
            }
        }
        drain_ready(&mut request_rx, &mut queue);
        let Some(request) = queue.pop_front() else {
            continue;
        };

        let response = match request {
            StoreRequest::Load { version, bot } => {
                let result = match store.load_graph(&bot).await {
                    Ok(graph_json) => decode_graph(&graph_json),
                    Err(e) => Err(e.into()),
                };
                StoreResponse::Loaded { version, result }
            }
            StoreRequest::Save {
                version,
                bot,
                graph_json,
            } => {
                let outcome = if queue.iter().any(|r| r.is_save_for(&bot)) {
                    tracing::debug!("Save v{version} for {bot} superseded");
                    SaveOutcome::Superseded
                } else {
                    save_with_retry(
                        &store,
                        &retry,
                        &mut request_rx,
                        &mut queue,
                        version,
                        &bot,
                        &graph_json,
                        &status,
                    )
                    .await
                };
                StoreResponse::Saved { version, outcome }
            }
        };

        // The bridge may already be gone; queued saves still get written.
        let _ = response_tx.send(response);
    }
    tracing::debug!("Persistence worker finished");
}

fn drain_ready(
    request_rx: &mut mpsc::UnboundedReceiver<StoreRequest>,
    queue: &mut VecDeque<StoreRequest>,
) {
    while let Ok(request) = request_rx.try_recv() {
        queue.push_back(request);
    }
}

async fn save_with_retry<S: GraphStore>(
    store: &S,
    retry: &RetryPolicy,
    request_rx: &mut mpsc::UnboundedReceiver<StoreRequest>,
    queue: &mut VecDeque<StoreRequest>,
    version: u64,
    bot: &BotPath,
    graph_json: &str,
    status: &RwLock<SaveStatus>,
) -> SaveOutcome {
    let mut attempt = 0;
    loop {
        match store.save_graph(bot, graph_json).await {
            Ok(()) => {
                let mut status = status.write();
                status.last_persisted = Some(version);
                status.last_error = None;
                return SaveOutcome::Persisted {
                    attempts: attempt + 1,
                };
            }
            Err(e) if attempt >= retry.max_retries => {
                tracing::warn!(
                    "Giving up on graph save v{version} for {bot} after {} attempts: {e}",
                    attempt + 1
                );
                status.write().last_error = Some(e.to_string());
                return SaveOutcome::Failed {
                    attempts: attempt + 1,
                    error: e.to_string(),
                };
            }
            Err(e) => {
                let delay = retry.delay(attempt);
                attempt += 1;
                tracing::warn!(
                    "Graph save v{version} for {bot} failed: {e}; retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;

                drain_ready(request_rx, queue);
                if queue.iter().any(|r| r.is_save_for(bot)) {
                    tracing::debug!("Save v{version} for {bot} superseded while retrying");
                    return SaveOutcome::Superseded;
                }
            }
        }
    }
}

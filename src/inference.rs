//! Core inference engine
//!
//! Requests enter a bounded submission queue and a collector task groups
//! them into per-model batches inside a short window. A fixed pool of
//! worker tasks executes the batches and answers each request over its
//! oneshot reply channel. The submitter enforces the per-request deadline,
//! so a request abandoned by its caller is skipped instead of executed.

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::models::{ModelHandle, ModelStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Correlation id carried by a request through logs and responses
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request structure for inference
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Correlation id
    pub id: RequestId,
    /// Registered model name
    pub model: String,
    /// Schema-checked input payload
    pub payload: Map<String, Value>,
    /// When the request entered the server
    pub submitted_at: Instant,
}

impl InferenceRequest {
    pub fn new<S: Into<String>>(model: S, payload: Map<String, Value>) -> Self {
        Self {
            id: RequestId::new(),
            model: model.into(),
            payload,
            submitted_at: Instant::now(),
        }
    }

    /// Keep a caller-supplied correlation id
    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }
}

/// Response structure for inference
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResponse {
    /// Correlation id of the request
    pub id: RequestId,
    /// Model that produced the output
    pub model: String,
    /// Output payload matching the model's output schema
    pub output: Map<String, Value>,
    /// Wall time from submission to completion
    pub latency_ms: u64,
    /// Timestamp when the response was created
    pub created: i64,
}

/// Engine-wide statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Total number of submissions
    pub total_requests: u64,
    /// Requests answered with an output payload
    pub successful_requests: u64,
    /// Requests answered with an execution error
    pub failed_requests: u64,
    /// Requests that hit their deadline
    pub timed_out_requests: u64,
    /// Requests rejected before queueing
    pub rejected_requests: u64,
    /// Batches handed to workers
    pub batches_executed: u64,
    /// Average number of requests per batch
    pub avg_batch_size: f64,
    /// Average completion latency in milliseconds
    pub avg_latency_ms: f64,
    /// Engine uptime in seconds
    pub uptime_seconds: u64,
}

impl Default for EngineStats {
    fn default() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            timed_out_requests: 0,
            rejected_requests: 0,
            batches_executed: 0,
            avg_batch_size: 0.0,
            avg_latency_ms: 0.0,
            uptime_seconds: 0,
        }
    }
}

/// A queued request with its reply channel
struct Job {
    request: InferenceRequest,
    reply: oneshot::Sender<Result<InferenceResponse>>,
}

/// A group of requests for one model, executed by one worker
struct Batch {
    model: Arc<ModelHandle>,
    jobs: Vec<Job>,
}

/// Requests for one model waiting for their window to close
struct PendingBatch {
    model: Arc<ModelHandle>,
    jobs: Vec<Job>,
    deadline: tokio::time::Instant,
}

/// Main inference engine that owns the queue, collector, and workers
#[derive(Clone)]
pub struct InferenceEngine {
    submit_tx: mpsc::Sender<Job>,
    stats: Arc<RwLock<EngineStats>>,
    in_flight: Arc<AtomicUsize>,
    accepting: Arc<AtomicBool>,
    request_timeout: Duration,
    queue_depth: usize,
    started_at: Instant,
}

impl InferenceEngine {
    /// Build the engine and spawn its collector and worker tasks
    pub fn start(config: &Config, store: Arc<ModelStore>) -> Self {
        Self::build(config, store, true)
    }

    fn build(config: &Config, store: Arc<ModelStore>, spawn_tasks: bool) -> Self {
        let queue_depth = config.engine.queue_depth;
        let workers = config.engine.workers;
        let (submit_tx, submit_rx) = mpsc::channel::<Job>(queue_depth);
        let (dispatch_tx, dispatch_rx) = mpsc::channel::<Batch>(workers.max(1) * 2);

        let stats = Arc::new(RwLock::new(EngineStats::default()));

        if spawn_tasks {
            let batch_config = config.batch.clone();
            let window = config.batch_window();
            let collector_stats = Arc::clone(&stats);
            tokio::spawn(run_collector(
                submit_rx,
                dispatch_tx,
                store,
                batch_config,
                window,
                collector_stats,
            ));

            let dispatch_rx = Arc::new(Mutex::new(dispatch_rx));
            for worker_id in 0..workers {
                let rx = Arc::clone(&dispatch_rx);
                let worker_stats = Arc::clone(&stats);
                tokio::spawn(run_worker(worker_id, rx, worker_stats));
            }

            info!(
                workers,
                queue_depth,
                batching = config.batch.enabled,
                window_ms = config.batch.window_ms,
                "Inference engine started"
            );
        } else {
            // No collector or workers: park the receivers so the submission
            // channel stays open and jobs queue unanswered until the deadline.
            std::mem::forget(submit_rx);
            std::mem::forget(dispatch_rx);
        }

        Self {
            submit_tx,
            stats,
            in_flight: Arc::new(AtomicUsize::new(0)),
            accepting: Arc::new(AtomicBool::new(true)),
            request_timeout: config.request_timeout(),
            queue_depth,
            started_at: Instant::now(),
        }
    }

    /// Engine with no collector or workers, for exercising rejection paths
    #[cfg(test)]
    fn without_workers(config: &Config, store: Arc<ModelStore>) -> Self {
        Self::build(config, store, false)
    }

    /// Submit a request and wait for its result or deadline
    pub async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse> {
        {
            let mut stats = self.stats.write();
            stats.total_requests += 1;
        }

        if !self.accepting.load(Ordering::SeqCst) {
            self.stats.write().rejected_requests += 1;
            return Err(EngineError::not_ready("engine is draining"));
        }

        let request_id = request.id.clone();
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            request,
            reply: reply_tx,
        };

        if let Err(err) = self.submit_tx.try_send(job) {
            self.stats.write().rejected_requests += 1;
            return match err {
                mpsc::error::TrySendError::Full(_) => {
                    debug!(request_id = %request_id, "Submission queue full");
                    Err(EngineError::busy("submission queue is full"))
                }
                mpsc::error::TrySendError::Closed(_) => {
                    Err(EngineError::not_ready("engine is stopped"))
                }
            };
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(EngineError::internal("Reply channel closed")),
            Err(_) => {
                self.stats.write().timed_out_requests += 1;
                warn!(
                    request_id = %request_id,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Request deadline exceeded"
                );
                Err(EngineError::timeout(self.request_timeout.as_millis() as u64))
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        result
    }

    /// Number of submitted requests not yet answered
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Remaining submission queue capacity
    pub fn queue_available(&self) -> usize {
        self.submit_tx.capacity()
    }

    /// Configured submission queue capacity
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Get engine statistics
    pub fn get_stats(&self) -> EngineStats {
        let mut stats = self.stats.read().clone();
        stats.uptime_seconds = self.started_at.elapsed().as_secs();
        stats
    }

    /// Stop accepting work and wait for in-flight requests, up to `grace`.
    /// Returns false if requests were still in flight when it expired.
    pub async fn drain(&self, grace: Duration) -> bool {
        info!(
            grace_secs = grace.as_secs(),
            in_flight = self.in_flight(),
            "Draining inference engine"
        );
        self.accepting.store(false, Ordering::SeqCst);

        let deadline = tokio::time::Instant::now() + grace;
        while self.in_flight() > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    in_flight = self.in_flight(),
                    "Drain grace period expired with requests in flight"
                );
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        info!("Inference engine drained");
        true
    }
}

/// Group submissions into per-model batches and hand them to workers
async fn run_collector(
    mut submit_rx: mpsc::Receiver<Job>,
    dispatch_tx: mpsc::Sender<Batch>,
    store: Arc<ModelStore>,
    batch_config: crate::config::BatchConfig,
    window: Duration,
    stats: Arc<RwLock<EngineStats>>,
) {
    let mut pending: HashMap<String, PendingBatch> = HashMap::new();
    let batching = batch_config.enabled && batch_config.max_size > 1;

    loop {
        let next_deadline = pending.values().map(|batch| batch.deadline).min();

        tokio::select! {
            maybe_job = submit_rx.recv() => {
                let Some(job) = maybe_job else { break };

                let model = match store.get(&job.request.model) {
                    Ok(model) => model,
                    Err(e) => {
                        let _ = job.reply.send(Err(e));
                        continue;
                    }
                };

                if !batching {
                    dispatch(&dispatch_tx, Batch { model, jobs: vec![job] }, &stats).await;
                    continue;
                }

                let name = job.request.model.clone();
                let entry = pending.entry(name.clone()).or_insert_with(|| PendingBatch {
                    model,
                    jobs: Vec::new(),
                    deadline: tokio::time::Instant::now() + window,
                });
                entry.jobs.push(job);

                if entry.jobs.len() >= batch_config.max_size {
                    if let Some(batch) = pending.remove(&name) {
                        dispatch(
                            &dispatch_tx,
                            Batch { model: batch.model, jobs: batch.jobs },
                            &stats,
                        )
                        .await;
                    }
                }
            }
            _ = wait_for(next_deadline) => {
                let now = tokio::time::Instant::now();
                let due: Vec<String> = pending
                    .iter()
                    .filter(|(_, batch)| batch.deadline <= now)
                    .map(|(name, _)| name.clone())
                    .collect();
                for name in due {
                    if let Some(batch) = pending.remove(&name) {
                        dispatch(
                            &dispatch_tx,
                            Batch { model: batch.model, jobs: batch.jobs },
                            &stats,
                        )
                        .await;
                    }
                }
            }
        }
    }

    // Submission side closed, flush whatever is still waiting
    for (_, batch) in pending.drain() {
        dispatch(
            &dispatch_tx,
            Batch { model: batch.model, jobs: batch.jobs },
            &stats,
        )
        .await;
    }
    debug!("Batch collector stopped");
}

/// Sleep until the deadline, or forever when there is none
async fn wait_for(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn dispatch(dispatch_tx: &mpsc::Sender<Batch>, batch: Batch, stats: &RwLock<EngineStats>) {
    let size = batch.jobs.len();
    {
        let mut stats = stats.write();
        let n = stats.batches_executed as f64;
        stats.avg_batch_size = (stats.avg_batch_size * n + size as f64) / (n + 1.0);
        stats.batches_executed += 1;
    }

    if let Err(mpsc::error::SendError(batch)) = dispatch_tx.send(batch).await {
        for job in batch.jobs {
            let _ = job.reply.send(Err(EngineError::not_ready("engine is stopped")));
        }
    }
}

/// Pull batches off the shared dispatch queue and execute them
async fn run_worker(
    worker_id: usize,
    dispatch_rx: Arc<Mutex<mpsc::Receiver<Batch>>>,
    stats: Arc<RwLock<EngineStats>>,
) {
    loop {
        let batch = { dispatch_rx.lock().await.recv().await };
        let Some(batch) = batch else { break };
        execute_batch(worker_id, batch, &stats);
    }
    debug!(worker_id, "Inference worker stopped");
}

fn execute_batch(worker_id: usize, batch: Batch, stats: &RwLock<EngineStats>) {
    let mut live = Vec::with_capacity(batch.jobs.len());
    for job in batch.jobs {
        // The submitter gave up (deadline or disconnect), skip the work
        if job.reply.is_closed() {
            debug!(request_id = %job.request.id, "Skipping abandoned request");
            continue;
        }
        live.push(job);
    }
    if live.is_empty() {
        return;
    }

    let started = Instant::now();
    let payloads: Vec<Map<String, Value>> = live
        .iter()
        .map(|job| job.request.payload.clone())
        .collect();
    let results = batch.model.predict_batch(&payloads);

    debug!(
        worker_id,
        model = batch.model.name(),
        size = live.len(),
        duration_us = started.elapsed().as_micros() as u64,
        "Executed batch"
    );

    for (job, result) in live.into_iter().zip(results) {
        deliver(job, result, stats);
    }
}

/// Answer one request. Completion stats count only replies that reached
/// their submitter; a submitter that gave up mid-batch has already
/// recorded its own timeout.
fn deliver(job: Job, result: Result<Map<String, Value>>, stats: &RwLock<EngineStats>) {
    let latency_ms = job.request.submitted_at.elapsed().as_millis() as u64;
    let succeeded = result.is_ok();
    let response = result.map(|output| InferenceResponse {
        id: job.request.id.clone(),
        model: job.request.model.clone(),
        output,
        latency_ms,
        created: chrono::Utc::now().timestamp(),
    });

    if job.reply.send(response).is_err() {
        debug!(request_id = %job.request.id, "Reply abandoned during execution");
        return;
    }

    let mut stats = stats.write();
    let completed = (stats.successful_requests + stats.failed_requests) as f64;
    stats.avg_latency_ms =
        (stats.avg_latency_ms * completed + latency_ms as f64) / (completed + 1.0);
    if succeeded {
        stats.successful_requests += 1;
    } else {
        stats.failed_requests += 1;
    }
}

//! Extraction worker pool.
//!
//! A fixed number of workers pull jobs from a shared queue, so at most `workers`
//! requests are in flight. Each worker sleeps `request_delay` after every request.
//! Each outcome is recorded in a shared map as soon as its job finishes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use super::ContentExtractor;
use crate::cancel::CancelFlag;
use crate::models::ExtractedContent;
use crate::report::Checkpoint;

/// One page to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    /// Normalized key of the missing URL.
    pub key: String,
    /// Absolute URL to fetch.
    pub url: String,
}

/// Result for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Extracted(ExtractedContent),
    Failed(String),
}

/// Events emitted during extraction, for progress display.
#[derive(Debug, Clone)]
pub enum ExtractionEvent {
    Started { worker_id: usize, url: String },
    Completed { worker_id: usize, url: String },
    Failed {
        worker_id: usize,
        url: String,
        error: String,
    },
}

/// Configuration for the extraction pool.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub workers: usize,
    pub request_delay: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            request_delay: Duration::from_millis(500),
        }
    }
}

/// Runs extraction jobs on a bounded pool of tokio tasks.
pub struct ExtractionService {
    extractor: ContentExtractor,
    config: ExtractionConfig,
    checkpoint: Option<Arc<Checkpoint>>,
}

impl ExtractionService {
    pub fn new(extractor: ContentExtractor, config: ExtractionConfig) -> Self {
        Self {
            extractor,
            config,
            checkpoint: None,
        }
    }

    /// Append every successful extraction to a checkpoint as it completes.
    pub fn with_checkpoint(mut self, checkpoint: Arc<Checkpoint>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Run all jobs. Jobs not started before cancellation, and a job whose worker
    /// panicked, have no outcome.
    pub async fn run(
        &self,
        jobs: Vec<ExtractionJob>,
        event_tx: mpsc::Sender<ExtractionEvent>,
        cancel: &CancelFlag,
    ) -> HashMap<String, ExtractionOutcome> {
        let total = jobs.len();
        let workers = self.config.workers.clamp(1, total.max(1));
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let outcomes = Arc::new(Mutex::new(HashMap::with_capacity(total)));

        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let queue = queue.clone();
            let outcomes = outcomes.clone();
            let extractor = self.extractor.clone();
            let checkpoint = self.checkpoint.clone();
            let delay = self.config.request_delay;
            let event_tx = event_tx.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        debug!("Worker {} stopping on cancellation", worker_id);
                        break;
                    }

                    let job = queue.lock().await.pop_front();
                    let Some(job) = job else {
                        break;
                    };

                    let _ = event_tx
                        .send(ExtractionEvent::Started {
                            worker_id,
                            url: job.url.clone(),
                        })
                        .await;

                    let outcome = match extractor.extract(&job.key, &job.url).await {
                        Ok(content) => {
                            if let Some(ref checkpoint) = checkpoint {
                                if let Err(e) = checkpoint.append(&content).await {
                                    warn!("Failed to checkpoint {}: {}", job.key, e);
                                }
                            }
                            let _ = event_tx
                                .send(ExtractionEvent::Completed {
                                    worker_id,
                                    url: job.url.clone(),
                                })
                                .await;
                            ExtractionOutcome::Extracted(content)
                        }
                        Err(e) => {
                            warn!("Extraction failed for {}: {}", job.url, e);
                            let _ = event_tx
                                .send(ExtractionEvent::Failed {
                                    worker_id,
                                    url: job.url.clone(),
                                    error: e.to_string(),
                                })
                                .await;
                            ExtractionOutcome::Failed(e.to_string())
                        }
                    };

                    outcomes.lock().await.insert(job.key, outcome);
                    tokio::time::sleep(delay).await;
                }
            });

            handles.push(handle);
        }

        drop(event_tx);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Extraction worker task failed: {}", e);
            }
        }

        let mut outcomes = outcomes.lock().await;
        std::mem::take(&mut *outcomes)
    }
}

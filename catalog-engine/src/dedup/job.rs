use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use catalog_shared::{Core, Visibility};
use futures::{pin_mut, TryStreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::generator::{file_task, CandidateGenerator, WorkCheck};
use super::queue::{CandidateQueue, TaskMap};
use crate::errors::EngineError;

/// Counters shared between a running job and its handle.
#[derive(Debug, Default)]
pub struct DedupProgress {
    pub works_scanned: AtomicU64,
    pub works_rejected: AtomicU64,
    pub references_checked: AtomicU64,
    pub candidates_emitted: AtomicU64,
}

impl DedupProgress {
    pub fn snapshot(&self) -> DedupRun {
        DedupRun {
            works_scanned: self.works_scanned.load(Ordering::Relaxed),
            works_rejected: self.works_rejected.load(Ordering::Relaxed),
            references_checked: self.references_checked.load(Ordering::Relaxed),
            candidates_emitted: self.candidates_emitted.load(Ordering::Relaxed),
            completed: false,
        }
    }
}

/// Totals of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupRun {
    pub works_scanned: u64,
    pub works_rejected: u64,
    pub references_checked: u64,
    pub candidates_emitted: u64,
    /// False when the run was stopped before the scan finished; the queue is then
    /// left untouched.
    pub completed: bool,
}

/// Offline candidate generation over the work core.
pub struct DedupJob {
    generator: CandidateGenerator,
    queue: Arc<dyn CandidateQueue>,
    progress: Arc<DedupProgress>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl DedupJob {
    pub fn new(generator: CandidateGenerator, queue: Arc<dyn CandidateQueue>) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            generator,
            queue,
            progress: Arc::new(DedupProgress::default()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Spawn the run on the runtime.
    pub fn start(self) -> DedupHandle {
        let progress = Arc::clone(&self.progress);
        let shutdown_tx = self.shutdown_tx.clone();
        let join = tokio::spawn(async move { self.run().await });
        DedupHandle {
            shutdown_tx,
            progress,
            join,
        }
    }

    /// Scan every work, then replace the queue with the collected tasks.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> Result<DedupRun, EngineError> {
        info!("Starting dedup candidate generation");
        let mut stopped = false;

        let mut progress_timer = interval(Duration::from_secs(10));
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut prev_works: u64 = 0;
        let mut prev_time = std::time::Instant::now();

        let (query, scan_fields) = CandidateGenerator::scan_query();
        let works = self
            .generator
            .gateway()
            .stream(Core::Work, query, scan_fields, Visibility::Public);
        pin_mut!(works);
        let mut tasks = TaskMap::new();

        loop {
            tokio::select! {
                next = works.try_next() => {
                    let Some(work) = next.map_err(|e| EngineError::from_index(e, "dedup"))? else {
                        break;
                    };
                    self.progress.works_scanned.fetch_add(1, Ordering::Relaxed);
                    match self.generator.check_work(&work).await? {
                        WorkCheck::Rejected(reason) => {
                            self.progress.works_rejected.fetch_add(1, Ordering::Relaxed);
                            warn!(publication_id = work.id().unwrap_or_default(), reason = %reason, "Work rejected");
                        }
                        WorkCheck::Checked { references, task } => {
                            self.progress
                                .references_checked
                                .fetch_add(references as u64, Ordering::Relaxed);
                            if let Some(task) = task {
                                self.progress
                                    .candidates_emitted
                                    .fetch_add(task.candidates.len() as u64, Ordering::Relaxed);
                                if file_task(&mut tasks, &work, &task)? == 0 {
                                    debug!(publication_id = %task.publication_id, "Work has no catalog");
                                }
                            }
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Dedup run stopped");
                    stopped = true;
                    break;
                }
                _ = progress_timer.tick() => {
                    let works = self.progress.works_scanned.load(Ordering::Relaxed);
                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();
                    let works_per_sec = if elapsed_secs > 0.0 {
                        (works.saturating_sub(prev_works) as f64) / elapsed_secs
                    } else {
                        0.0
                    };
                    info!(
                        works_scanned = works,
                        works_rejected = self.progress.works_rejected.load(Ordering::Relaxed),
                        references_checked = self.progress.references_checked.load(Ordering::Relaxed),
                        candidates_emitted = self.progress.candidates_emitted.load(Ordering::Relaxed),
                        works_per_sec = format!("{:.2}", works_per_sec),
                        "Dedup progress"
                    );
                    prev_works = works;
                    prev_time = now;
                }
            }
        }

        let mut run = self.progress.snapshot();
        if stopped {
            return Ok(run);
        }

        self.queue.replace(&tasks).await?;
        run.completed = true;
        info!(
            works_scanned = run.works_scanned,
            works_rejected = run.works_rejected,
            candidates_emitted = run.candidates_emitted,
            publications = tasks.values().map(|t| t.len()).sum::<usize>(),
            "Dedup queue replaced"
        );
        Ok(run)
    }
}

/// Control over a started [`DedupJob`].
pub struct DedupHandle {
    shutdown_tx: broadcast::Sender<()>,
    progress: Arc<DedupProgress>,
    join: JoinHandle<Result<DedupRun, EngineError>>,
}

impl DedupHandle {
    /// Ask the run to stop. A stopped run leaves the previous queue in place.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn progress(&self) -> DedupRun {
        self.progress.snapshot()
    }

    pub async fn join(self) -> Result<DedupRun, EngineError> {
        joined(self.join.await)
    }

    /// Wait for the run, stopping it on Ctrl-C.
    pub async fn join_or_interrupt(mut self) -> Result<DedupRun, EngineError> {
        tokio::select! {
            result = &mut self.join => return joined(result),
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                self.stop();
            }
        }
        self.join().await
    }
}

fn joined(
    result: Result<Result<DedupRun, EngineError>, tokio::task::JoinError>,
) -> Result<DedupRun, EngineError> {
    result.map_err(|e| EngineError::queue(format!("dedup task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::{DedupConfig, InMemoryQueue};
    use crate::projector::names;
    use catalog_repository::{InMemoryProvider, IndexGateway};
    use catalog_shared::{fields, Catalog, IndexDocument};

    fn person(id: &str, name: &str, family: &str, given: &str) -> IndexDocument {
        let mut doc = IndexDocument::new(id);
        doc.set("name", name);
        doc.set(names::NAME_FAMILY, family);
        doc.push(names::NAME_GIVEN, given);
        doc
    }

    fn work(id: &str, tokens: &[&str]) -> IndexDocument {
        let mut doc = IndexDocument::new(id);
        doc.set("title", format!("Title of {}", id));
        doc.push(fields::CATALOG, Catalog::Rub.as_str());
        for token in tokens {
            doc.push(names::PERSON_AUTHORITY, *token);
        }
        doc
    }

    async fn gateway() -> Arc<IndexGateway> {
        let gateway = Arc::new(IndexGateway::new(Arc::new(InMemoryProvider::new())));
        gateway.ensure_cores().await.unwrap();
        gateway
            .put(Core::Person, vec![person("P1", "Smith, John", "smith", "john")])
            .await
            .unwrap();
        gateway
            .put(
                Core::Work,
                vec![
                    work("W1", &["G#L#Smith, John"]),
                    work("W2", &["G#L#Smith, John", "malformed"]),
                    work("W3", &["gnd#9#Nobody, Known"]),
                ],
            )
            .await
            .unwrap();
        gateway
    }

    #[tokio::test]
    async fn test_run_replaces_queue() {
        let gateway = gateway().await;
        let queue = Arc::new(InMemoryQueue::new());
        queue
            .put(Catalog::Rub, "STALE", &serde_json::json!({}))
            .await
            .unwrap();

        let generator = CandidateGenerator::new(gateway, DedupConfig::default());
        let run = DedupJob::new(generator, queue.clone())
            .start()
            .join()
            .await
            .unwrap();

        assert!(run.completed);
        assert_eq!(run.works_scanned, 3);
        assert_eq!(run.works_rejected, 1);
        assert_eq!(run.candidates_emitted, 1);
        assert_eq!(queue.len(Catalog::Rub).await.unwrap(), 1);

        let (id, payload) = queue.pop(Catalog::Rub).await.unwrap().unwrap();
        assert_eq!(id, "W1");
        assert_eq!(payload["candidates"][0]["person_id"], "P1");
        assert_eq!(payload["candidates"][0]["probability"], 100);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let gateway = gateway().await;
        let queue = Arc::new(InMemoryQueue::new());
        for _ in 0..2 {
            let generator = CandidateGenerator::new(gateway.clone(), DedupConfig::default());
            DedupJob::new(generator, queue.clone()).run().await.unwrap();
        }
        assert_eq!(queue.len(Catalog::Rub).await.unwrap(), 1);
    }
}

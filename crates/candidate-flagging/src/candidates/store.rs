//! In-memory candidate collection with a write-behind durable mirror.
//!
//! Every mutation is applied under one mutex, which is the single writer path
//! for the collection. Durable writes go through a queue drained by a
//! background task: requests that arrive while a write is throttled are
//! coalesced into a single snapshot write, and every waiter receives that
//! write's outcome. Callers await their flush, so storage failures surface on
//! the operation that triggered them.
//!
//! A crash after a mutation is applied in memory but before its flush lands
//! loses that mutation; `shutdown` closes the window for orderly exits.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use super::domain::{CandidateId, CandidateRecord, FlagId};
use super::evaluation::EvaluationResult;
use super::repository::{
    FlagReview, JsonFileSink, RepositoryError, SnapshotSink, StoredCandidate,
};

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Tuning for the write-behind queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Minimum spacing between two durable writes.
    pub flush_interval: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

type Records = Arc<Mutex<Vec<StoredCandidate>>>;

struct FlushRequest {
    reply: oneshot::Sender<Result<(), RepositoryError>>,
}

/// Owner of every stored candidate record.
pub struct CandidateStore<S = JsonFileSink> {
    records: Records,
    queue: Mutex<Option<mpsc::UnboundedSender<FlushRequest>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    sink: Arc<S>,
}

impl<S: SnapshotSink> CandidateStore<S> {
    /// Load the durable collection and start the writer task.
    ///
    /// Must be called from within a Tokio runtime. A sink that cannot be read is
    /// asked to set its contents aside and the store starts empty rather than
    /// failing startup.
    pub async fn open(sink: Arc<S>, options: StoreOptions) -> Self {
        let loaded = match on_blocking_pool(sink.clone(), |sink| sink.load()).await {
            Ok(records) => {
                info!(records = records.len(), "candidate store loaded");
                records
            }
            Err(err) => {
                match on_blocking_pool(sink.clone(), |sink| sink.set_aside()).await {
                    Ok(Some(moved_to)) => warn!(
                        %err,
                        moved_to = %moved_to.display(),
                        "candidate data unreadable, moved aside; starting with an empty store"
                    ),
                    Ok(None) => {
                        warn!(%err, "candidate data unreadable, starting with an empty store")
                    }
                    Err(set_aside_err) => error!(
                        %err,
                        %set_aside_err,
                        "candidate data unreadable and could not be moved aside; starting with an empty store"
                    ),
                }
                Vec::new()
            }
        };

        let records: Records = Arc::new(Mutex::new(loaded));
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(
            sink.clone(),
            records.clone(),
            receiver,
            options.flush_interval,
        ));

        Self {
            records,
            queue: Mutex::new(Some(sender)),
            writer: Mutex::new(Some(writer)),
            sink,
        }
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Store a freshly evaluated candidate and return its new identity.
    ///
    /// Flags without an id receive one, reviewer state is kept as supplied and
    /// the verdict is re-derived from the flags before the record is appended.
    pub async fn create(
        &self,
        candidate: CandidateRecord,
        mut evaluation: EvaluationResult,
    ) -> Result<CandidateId, RepositoryError> {
        let sender = self.sender()?;

        let mut seen = HashSet::new();
        for flag in &mut evaluation.flags {
            let duplicate = flag
                .id
                .as_ref()
                .is_some_and(|id| !seen.insert(id.clone()));
            if flag.id.is_none() || duplicate {
                let id = FlagId::generate();
                seen.insert(id.clone());
                flag.id = Some(id);
            }
        }
        evaluation.recompute_eligibility();

        let id = CandidateId::generate();
        let record = StoredCandidate {
            id: id.clone(),
            candidate,
            evaluation,
            timestamp: Utc::now(),
        };

        {
            let mut records = lock(&self.records)?;
            records.push(record);
        }
        debug!(candidate_id = %id, "candidate stored");

        flush_via(&sender).await?;
        Ok(id)
    }

    pub fn all(&self) -> Result<Vec<StoredCandidate>, RepositoryError> {
        Ok(lock(&self.records)?.clone())
    }

    pub fn get(&self, id: &CandidateId) -> Result<Option<StoredCandidate>, RepositoryError> {
        Ok(lock(&self.records)?
            .iter()
            .find(|record| &record.id == id)
            .cloned())
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.records)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }

    /// Replace a flag's reviewer state and persist the record.
    ///
    /// Returns `Ok(None)` without touching anything when either identity is unknown.
    /// A review matching the stored state is answered without a write.
    pub async fn update_flag(
        &self,
        id: &CandidateId,
        flag_id: &FlagId,
        review: FlagReview,
    ) -> Result<Option<EvaluationResult>, RepositoryError> {
        let sender = self.sender()?;

        let (evaluation, changed) = {
            let mut records = lock(&self.records)?;
            let Some(record) = records.iter_mut().find(|record| &record.id == id) else {
                warn!(candidate_id = %id, "flag update for unknown candidate");
                return Ok(None);
            };
            let Some(flag) = record
                .evaluation
                .flags
                .iter_mut()
                .find(|flag| flag.id.as_ref() == Some(flag_id))
            else {
                warn!(candidate_id = %id, flag_id = %flag_id, "flag update for unknown flag");
                return Ok(None);
            };

            let override_changed = flag.overridden != review.overridden;
            let changed = override_changed || flag.acknowledged != review.acknowledged;
            flag.acknowledged = review.acknowledged;
            flag.overridden = review.overridden;
            if override_changed {
                record.evaluation.recompute_eligibility();
            }
            (record.evaluation.clone(), changed)
        };
        if !changed {
            debug!(candidate_id = %id, flag_id = %flag_id, "flag review unchanged");
            return Ok(Some(evaluation));
        }
        debug!(
            candidate_id = %id,
            flag_id = %flag_id,
            acknowledged = review.acknowledged,
            overridden = review.overridden,
            is_eligible = evaluation.is_eligible,
            "flag review applied"
        );

        flush_via(&sender).await?;
        Ok(Some(evaluation))
    }

    /// Wait until the current in-memory state is durable.
    pub async fn flush(&self) -> Result<(), RepositoryError> {
        let sender = self.sender()?;
        flush_via(&sender).await
    }

    /// Final flush, then stop the writer task. Later mutations fail with `Closed`.
    pub async fn shutdown(&self) -> Result<(), RepositoryError> {
        let Some(sender) = lock(&self.queue)?.take() else {
            return Ok(());
        };
        let flushed = flush_via(&sender).await;
        drop(sender);

        let writer = lock(&self.writer)?.take();
        if let Some(writer) = writer {
            if let Err(err) = writer.await {
                warn!(%err, "candidate store writer ended abnormally");
            }
        }
        info!("candidate store shut down");
        flushed
    }

    fn sender(&self) -> Result<mpsc::UnboundedSender<FlushRequest>, RepositoryError> {
        lock(&self.queue)?.clone().ok_or(RepositoryError::Closed)
    }
}

async fn on_blocking_pool<S, T, F>(sink: Arc<S>, work: F) -> Result<T, RepositoryError>
where
    S: SnapshotSink,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T, RepositoryError> + Send + 'static,
{
    task::spawn_blocking(move || work(&sink))
        .await
        .map_err(|err| RepositoryError::Unavailable(format!("storage task failed: {err}")))?
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("candidate store lock poisoned".to_string()))
}

async fn flush_via(
    sender: &mpsc::UnboundedSender<FlushRequest>,
) -> Result<(), RepositoryError> {
    let (reply, done) = oneshot::channel();
    sender
        .send(FlushRequest { reply })
        .map_err(|_| RepositoryError::Closed)?;
    done.await.map_err(|_| RepositoryError::Closed)?
}

async fn run_writer<S: SnapshotSink>(
    sink: Arc<S>,
    records: Records,
    mut requests: mpsc::UnboundedReceiver<FlushRequest>,
    flush_interval: Duration,
) {
    let mut last_write: Option<Instant> = None;

    while let Some(first) = requests.recv().await {
        if let Some(last) = last_write {
            time::sleep_until(last + flush_interval).await;
        }

        let mut waiters = vec![first.reply];
        while let Ok(next) = requests.try_recv() {
            waiters.push(next.reply);
        }

        let snapshot = lock(&records).map(|guard| guard.clone());
        let result = match snapshot {
            Ok(snapshot) => {
                on_blocking_pool(sink.clone(), move |sink| sink.persist(&snapshot)).await
            }
            Err(err) => Err(err),
        };
        last_write = Some(Instant::now());

        match &result {
            Ok(()) => debug!(coalesced = waiters.len(), "candidate data flushed"),
            Err(err) => error!(%err, "failed to persist candidate data"),
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    debug!("candidate store writer stopped");
}

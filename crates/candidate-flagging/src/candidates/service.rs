use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::domain::{CandidateId, CandidateRecord, FlagId};
use super::evaluation::{EvaluationResult, FlaggingEngine};
use super::intake::{IntakeGuard, IntakeViolation};
use super::repository::{FlagReview, RepositoryError, SnapshotSink, StoredCandidate};
use super::store::CandidateStore;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Service composing the intake guard, rule engine, and candidate store.
pub struct FlaggingService<S> {
    guard: IntakeGuard,
    engine: FlaggingEngine,
    store: Arc<CandidateStore<S>>,
}

impl<S: SnapshotSink> FlaggingService<S> {
    pub fn new(store: Arc<CandidateStore<S>>) -> Self {
        Self {
            guard: IntakeGuard::new(),
            engine: FlaggingEngine::new(),
            store,
        }
    }

    pub fn store(&self) -> &Arc<CandidateStore<S>> {
        &self.store
    }

    /// Pure evaluation; nothing is stored and no identities are assigned.
    pub fn evaluate(&self, candidate: &CandidateRecord) -> EvaluationResult {
        self.engine.evaluate(candidate)
    }

    pub async fn create_and_store(
        &self,
        candidate: CandidateRecord,
        evaluation: EvaluationResult,
    ) -> Result<CandidateId, FlaggingServiceError> {
        Ok(self.store.create(candidate, evaluation).await?)
    }

    /// Evaluate and store; the returned result carries the assigned flag ids.
    pub async fn evaluate_and_store(
        &self,
        candidate: CandidateRecord,
    ) -> Result<(CandidateId, EvaluationResult), FlaggingServiceError> {
        let evaluation = self.evaluate(&candidate);
        let id = self.store.create(candidate, evaluation).await?;
        let stored = self
            .store
            .get(&id)?
            .ok_or_else(|| RepositoryError::Unavailable(format!("candidate {id} vanished")))?;

        info!(
            candidate_id = %id,
            flags = stored.evaluation.flags.len(),
            is_eligible = stored.evaluation.is_eligible,
            "candidate evaluation completed"
        );
        Ok((id, stored.evaluation))
    }

    /// Intake entry point for raw submissions.
    pub async fn submit(
        &self,
        payload: serde_json::Value,
    ) -> Result<(CandidateId, EvaluationResult), FlaggingServiceError> {
        let candidate = self.guard.candidate_from_payload(payload)?;
        self.evaluate_and_store(candidate).await
    }

    pub fn list_all(&self) -> Result<Vec<StoredCandidate>, FlaggingServiceError> {
        Ok(self.store.all()?)
    }

    /// One-based pagination over insertion order.
    pub fn list_page(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<CandidatePage, FlaggingServiceError> {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };

        let all = self.store.all()?;
        let total = all.len();
        let candidates = all
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(CandidatePage {
            candidates,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size),
        })
    }

    pub fn get(&self, id: &CandidateId) -> Result<Option<StoredCandidate>, FlaggingServiceError> {
        Ok(self.store.get(id)?)
    }

    /// `Ok(None)` means the candidate or flag does not exist.
    pub async fn update_flag(
        &self,
        id: &CandidateId,
        flag_id: &FlagId,
        review: FlagReview,
    ) -> Result<Option<EvaluationResult>, FlaggingServiceError> {
        Ok(self.store.update_flag(id, flag_id, review).await?)
    }

    pub async fn shutdown(&self) -> Result<(), FlaggingServiceError> {
        Ok(self.store.shutdown().await?)
    }
}

/// A slice of stored candidates plus totals for list views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePage {
    pub candidates: Vec<StoredCandidate>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Error raised by the flagging service.
#[derive(Debug, thiserror::Error)]
pub enum FlaggingServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

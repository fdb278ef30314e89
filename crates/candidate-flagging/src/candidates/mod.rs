//! Practice-ready candidate intake, rule evaluation, and reviewer flag tracking.
//!
//! Submissions pass the intake guard, run through the fixed rule battery, and
//! land in the candidate store together with their flags. Reviewers later
//! acknowledge or override individual flags; overriding re-derives the verdict.

pub mod domain;
pub mod evaluation;
pub mod intake;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    CandidateId, CandidateRecord, EnglishProficiency, FlagId, LegalStatus, PostGradTraining,
    ProficiencyScore, WrittenTdmResult,
};
pub use evaluation::{
    is_eligible, EvaluationResult, Flag, FlagCategory, FlagStatus, FlaggingEngine,
};
pub use intake::{IntakeGuard, IntakeViolation, REQUIRED_SUBMISSION_FIELDS};
pub use repository::{FlagReview, JsonFileSink, RepositoryError, SnapshotSink, StoredCandidate};
pub use router::candidate_router;
pub use service::{CandidatePage, FlaggingService, FlaggingServiceError, DEFAULT_PAGE_SIZE};
pub use store::{CandidateStore, StoreOptions};

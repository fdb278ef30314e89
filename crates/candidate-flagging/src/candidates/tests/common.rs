use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::{json, Value};

use crate::candidates::domain::{
    CandidateRecord, EnglishProficiency, LegalStatus, PostGradTraining, ProficiencyScore,
    WrittenTdmResult,
};
use crate::candidates::evaluation::{EvaluationResult, Flag};
use crate::candidates::repository::{RepositoryError, SnapshotSink, StoredCandidate};
use crate::candidates::store::{CandidateStore, StoreOptions};
use crate::candidates::FlaggingService;

pub(super) fn eligible_candidate() -> CandidateRecord {
    CandidateRecord {
        first_name: Some("Lena".to_string()),
        last_name: Some("Marchetti".to_string()),
        email: Some("lena.marchetti@example.org".to_string()),
        date_of_birth: Some("1987-06-02".to_string()),
        legal_status: Some(LegalStatus::PermanentResident),
        medical_school: Some("University of Bologna".to_string()),
        degree: Some("MD".to_string()),
        graduation_year: Some(2012),
        language_of_education: Some("Italian".to_string()),
        nac_date: Some("2021-03-10".to_string()),
        mccqe1_date: Some("2020-10-22".to_string()),
        mccqe2_date: Some("2021-11-05".to_string()),
        written_tdm: Some(WrittenTdmResult::Passed),
        has_canadian_driving_license: true,
        practice_hours: 900,
        english_proficiency: Some(EnglishProficiency::Ielts {
            score: Some(ProficiencyScore::Numeric(7.5)),
        }),
        post_grad_training: Some(PostGradTraining {
            completed: true,
            months: 24,
            independent_practice_months: 30,
        }),
        rotations_completed: 7,
        has_impairment_to_practice: false,
    }
}

pub(super) fn failing_candidate() -> CandidateRecord {
    CandidateRecord {
        legal_status: Some(LegalStatus::Other),
        written_tdm: Some(WrittenTdmResult::Failed),
        practice_hours: 500,
        rotations_completed: 3,
        has_impairment_to_practice: true,
        ..eligible_candidate()
    }
}

pub(super) fn eligible_payload() -> Value {
    json!({
        "firstName": "Lena",
        "lastName": "Marchetti",
        "email": "lena.marchetti@example.org",
        "dateOfBirth": "1987-06-02",
        "legalStatus": "Permanent Resident",
        "medicalSchool": "University of Bologna",
        "degree": "MD",
        "graduationYear": 2012,
        "languageOfEducation": "Italian",
        "nacDate": "2021-03-10",
        "mccqe1Date": "2020-10-22",
        "mccqe2Date": "2021-11-05",
        "writtenTDM": "Passed",
        "hasCanadianDrivingLicense": true,
        "practiceHours": 900,
        "englishProficiency": { "type": "IELTS", "score": 7.5 },
        "postGradTraining": {
            "completed": true,
            "months": 24,
            "independentPracticeMonths": 30
        },
        "rotationsCompleted": 7,
        "hasImpairmentToPractice": false
    })
}

pub(super) fn failing_payload() -> Value {
    let mut payload = eligible_payload();
    payload["legalStatus"] = json!("Other");
    payload["writtenTDM"] = json!("Failed");
    payload["practiceHours"] = json!(500);
    payload["rotationsCompleted"] = json!(3);
    payload["hasImpairmentToPractice"] = json!(true);
    payload
}

pub(super) fn flag_for<'a>(result: &'a EvaluationResult, field: &str) -> &'a Flag {
    result
        .flags
        .iter()
        .find(|flag| flag.field == field)
        .unwrap_or_else(|| panic!("no flag for {field}"))
}

pub(super) fn fast_options() -> StoreOptions {
    StoreOptions {
        flush_interval: Duration::from_millis(1),
    }
}

pub(super) async fn open_store<S: SnapshotSink>(sink: Arc<S>) -> Arc<CandidateStore<S>> {
    Arc::new(CandidateStore::open(sink, fast_options()).await)
}

pub(super) async fn build_service() -> (Arc<FlaggingService<MemorySink>>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let service = Arc::new(FlaggingService::new(open_store(sink.clone()).await));
    (service, sink)
}

/// Sink keeping every persisted snapshot so tests can count writes.
#[derive(Default)]
pub(super) struct MemorySink {
    seed: Vec<StoredCandidate>,
    snapshots: Mutex<Vec<Vec<StoredCandidate>>>,
}

impl MemorySink {
    pub(super) fn with_records(seed: Vec<StoredCandidate>) -> Self {
        Self {
            seed,
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn writes(&self) -> usize {
        self.snapshots.lock().expect("sink mutex poisoned").len()
    }

    pub(super) fn last_snapshot(&self) -> Option<Vec<StoredCandidate>> {
        self.snapshots
            .lock()
            .expect("sink mutex poisoned")
            .last()
            .cloned()
    }
}

impl SnapshotSink for MemorySink {
    fn load(&self) -> Result<Vec<StoredCandidate>, RepositoryError> {
        Ok(self.seed.clone())
    }

    fn persist(&self, records: &[StoredCandidate]) -> Result<(), RepositoryError> {
        self.snapshots
            .lock()
            .expect("sink mutex poisoned")
            .push(records.to_vec());
        Ok(())
    }
}

pub(super) struct FailingSink;

impl SnapshotSink for FailingSink {
    fn load(&self) -> Result<Vec<StoredCandidate>, RepositoryError> {
        Ok(Vec::new())
    }

    fn persist(&self, _records: &[StoredCandidate]) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }
}

#[derive(Default)]
pub(super) struct UnreadableSink {
    set_aside: AtomicBool,
}

impl UnreadableSink {
    pub(super) fn was_set_aside(&self) -> bool {
        self.set_aside.load(Ordering::SeqCst)
    }
}

impl SnapshotSink for UnreadableSink {
    fn load(&self) -> Result<Vec<StoredCandidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("parse candidates.json".to_string()))
    }

    fn persist(&self, _records: &[StoredCandidate]) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn set_aside(&self) -> Result<Option<PathBuf>, RepositoryError> {
        self.set_aside.store(true, Ordering::SeqCst);
        Ok(Some(PathBuf::from("candidates.json.corrupt")))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

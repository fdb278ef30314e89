use super::common::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::candidates::domain::{CandidateId, FlagId};
use crate::candidates::evaluation::{EvaluationResult, Flag, FlagCategory, FlagStatus, FlaggingEngine};
use crate::candidates::repository::{FlagReview, JsonFileSink, RepositoryError, SnapshotSink};
use crate::candidates::store::CandidateStore;

fn red_flag_id(evaluation: &EvaluationResult, field: &str) -> FlagId {
    evaluation
        .flags
        .iter()
        .find(|flag| flag.field == field && flag.is_red())
        .and_then(|flag| flag.id.clone())
        .unwrap_or_else(|| panic!("no red flag with id for {field}"))
}

async fn store_failing_candidate(
    store: &CandidateStore<MemorySink>,
) -> (CandidateId, EvaluationResult) {
    let candidate = failing_candidate();
    let evaluation = FlaggingEngine::new().evaluate(&candidate);
    let id = store
        .create(candidate, evaluation)
        .await
        .expect("candidate stored");
    let stored = store.get(&id).expect("read").expect("record exists");
    (id, stored.evaluation)
}

fn override_red_flags(evaluation: &EvaluationResult) -> Vec<FlagId> {
    evaluation
        .red_flags()
        .filter_map(|flag| flag.id.clone())
        .collect()
}

#[tokio::test]
async fn create_assigns_unique_ids_and_persists() {
    let sink = Arc::new(MemorySink::default());
    let store = open_store(sink.clone()).await;

    let (id, evaluation) = store_failing_candidate(&store).await;

    let ids: HashSet<FlagId> = evaluation
        .flags
        .iter()
        .map(|flag| flag.id.clone().expect("flag id assigned"))
        .collect();
    assert_eq!(ids.len(), evaluation.flags.len());
    assert!(!evaluation.is_eligible);

    let snapshot = sink.last_snapshot().expect("flushed on create");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    assert_eq!(snapshot[0].evaluation, evaluation);
}

#[tokio::test]
async fn create_keeps_supplied_ids_and_replaces_duplicates() {
    let store = open_store(Arc::new(MemorySink::default())).await;
    let mut evaluation = FlaggingEngine::new().evaluate(&eligible_candidate());
    evaluation.flags[0].id = Some(FlagId("kept".to_string()));
    evaluation.flags[1].id = Some(FlagId("kept".to_string()));

    let id = store
        .create(eligible_candidate(), evaluation)
        .await
        .expect("candidate stored");
    let stored = store.get(&id).expect("read").expect("record exists");

    assert_eq!(stored.evaluation.flags[0].id, Some(FlagId("kept".to_string())));
    assert_ne!(stored.evaluation.flags[1].id, Some(FlagId("kept".to_string())));
    assert!(stored.evaluation.flags[1].id.is_some());
}

#[tokio::test]
async fn create_rederives_verdict_from_flags() {
    let store = open_store(Arc::new(MemorySink::default())).await;
    let mut evaluation = FlaggingEngine::new().evaluate(&eligible_candidate());
    evaluation.flags.push(Flag::new(
        FlagCategory::Rotations,
        "rotationsCompleted",
        FlagStatus::Red,
        "Candidate must complete 7 rotations",
    ));
    assert!(evaluation.is_eligible);

    let id = store
        .create(eligible_candidate(), evaluation)
        .await
        .expect("candidate stored");
    let stored = store.get(&id).expect("read").expect("record exists");
    assert!(!stored.evaluation.is_eligible);
}

#[tokio::test]
async fn overriding_every_red_flag_makes_candidate_eligible() {
    let store = open_store(Arc::new(MemorySink::default())).await;
    let (id, evaluation) = store_failing_candidate(&store).await;

    let red = override_red_flags(&evaluation);
    let (last, rest) = red.split_last().expect("red flags present");
    for flag_id in rest {
        let updated = store
            .update_flag(
                &id,
                flag_id,
                FlagReview {
                    acknowledged: true,
                    overridden: true,
                },
            )
            .await
            .expect("update succeeds")
            .expect("flag exists");
        assert!(!updated.is_eligible);
    }

    let updated = store
        .update_flag(
            &id,
            last,
            FlagReview {
                acknowledged: false,
                overridden: true,
            },
        )
        .await
        .expect("update succeeds")
        .expect("flag exists");
    assert!(updated.is_eligible);

    let stored = store.get(&id).expect("read").expect("record exists");
    assert!(stored.evaluation.is_eligible);
}

#[tokio::test]
async fn acknowledging_alone_leaves_verdict_untouched() {
    let store = open_store(Arc::new(MemorySink::default())).await;
    let (id, evaluation) = store_failing_candidate(&store).await;
    let flag_id = red_flag_id(&evaluation, "legalStatus");

    let updated = store
        .update_flag(
            &id,
            &flag_id,
            FlagReview {
                acknowledged: true,
                overridden: false,
            },
        )
        .await
        .expect("update succeeds")
        .expect("flag exists");

    assert!(!updated.is_eligible);
    let flag = updated.flag(&flag_id).expect("flag present");
    assert!(flag.acknowledged);
    assert!(!flag.overridden);
}

#[tokio::test]
async fn repeated_update_is_idempotent() {
    let sink = Arc::new(MemorySink::default());
    let store = open_store(sink.clone()).await;
    let (id, evaluation) = store_failing_candidate(&store).await;
    let flag_id = red_flag_id(&evaluation, "writtenTDM");
    let review = FlagReview {
        acknowledged: true,
        overridden: true,
    };

    let first = store
        .update_flag(&id, &flag_id, review)
        .await
        .expect("update succeeds");
    let writes_after_first = sink.writes();
    let second = store
        .update_flag(&id, &flag_id, review)
        .await
        .expect("update succeeds");

    assert_eq!(first, second);
    assert_eq!(sink.writes(), writes_after_first);
}

#[tokio::test]
async fn update_replaces_both_review_fields() {
    let store = open_store(Arc::new(MemorySink::default())).await;
    let (id, evaluation) = store_failing_candidate(&store).await;
    let flag_id = red_flag_id(&evaluation, "practiceHours");

    store
        .update_flag(
            &id,
            &flag_id,
            FlagReview {
                acknowledged: true,
                overridden: true,
            },
        )
        .await
        .expect("update succeeds");
    let reverted = store
        .update_flag(&id, &flag_id, FlagReview::default())
        .await
        .expect("update succeeds")
        .expect("flag exists");

    let flag = reverted.flag(&flag_id).expect("flag present");
    assert!(!flag.acknowledged);
    assert!(!flag.overridden);
    assert!(!reverted.is_eligible);
}

#[tokio::test]
async fn unknown_identities_change_nothing() {
    let sink = Arc::new(MemorySink::default());
    let store = open_store(sink.clone()).await;
    let (id, evaluation) = store_failing_candidate(&store).await;
    let writes_before = sink.writes();
    let flag_id = red_flag_id(&evaluation, "legalStatus");
    let review = FlagReview {
        acknowledged: true,
        overridden: true,
    };

    let missing_candidate = store
        .update_flag(&CandidateId("nope".to_string()), &flag_id, review)
        .await
        .expect("lookup succeeds");
    let missing_flag = store
        .update_flag(&id, &FlagId("nope".to_string()), review)
        .await
        .expect("lookup succeeds");

    assert!(missing_candidate.is_none());
    assert!(missing_flag.is_none());
    assert_eq!(sink.writes(), writes_before);
    let stored = store.get(&id).expect("read").expect("record exists");
    assert_eq!(stored.evaluation, evaluation);
}

#[tokio::test]
async fn queued_flushes_coalesce_into_one_write() {
    let sink = Arc::new(MemorySink::default());
    let store = CandidateStore::open(
        sink.clone(),
        crate::candidates::StoreOptions {
            flush_interval: std::time::Duration::from_millis(50),
        },
    )
    .await;
    store.flush().await.expect("initial flush");
    assert_eq!(sink.writes(), 1);

    let (a, b, c, d) = tokio::join!(store.flush(), store.flush(), store.flush(), store.flush());
    for result in [a, b, c, d] {
        result.expect("flush succeeds");
    }

    assert_eq!(sink.writes(), 2);
}

#[tokio::test]
async fn storage_failure_surfaces_on_the_triggering_operation() {
    let store = open_store(Arc::new(FailingSink)).await;
    let candidate = eligible_candidate();
    let evaluation = FlaggingEngine::new().evaluate(&candidate);

    let result = store.create(candidate, evaluation).await;

    assert!(matches!(result, Err(RepositoryError::Unavailable(_))));
    // The in-memory copy is authoritative even when the mirror lags.
    assert_eq!(store.len().expect("len"), 1);
}

#[tokio::test]
async fn mutations_after_shutdown_are_rejected() {
    let sink = Arc::new(MemorySink::default());
    let store = open_store(sink.clone()).await;
    store_failing_candidate(&store).await;

    store.shutdown().await.expect("clean shutdown");
    store.shutdown().await.expect("second shutdown is a no-op");

    let candidate = eligible_candidate();
    let evaluation = FlaggingEngine::new().evaluate(&candidate);
    assert!(matches!(
        store.create(candidate, evaluation).await,
        Err(RepositoryError::Closed)
    ));
    assert_eq!(store.len().expect("len"), 1);
    assert_eq!(sink.last_snapshot().map(|records| records.len()), Some(1));
}

#[tokio::test]
async fn unreadable_data_is_set_aside_and_the_store_starts_empty() {
    let sink = Arc::new(UnreadableSink::default());
    let store = open_store(sink.clone()).await;

    assert!(sink.was_set_aside());
    assert!(store.is_empty().expect("len"));
}

#[tokio::test]
async fn corrupt_data_file_is_kept_beside_the_new_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("candidates.json");
    std::fs::write(&path, "{ not json").expect("write fixture");

    let store = open_store(Arc::new(JsonFileSink::new(&path))).await;
    assert!(store.is_empty().expect("len"));
    assert!(!path.exists());

    let candidate = eligible_candidate();
    let evaluation = FlaggingEngine::new().evaluate(&candidate);
    store.create(candidate, evaluation).await.expect("stored");
    store.shutdown().await.expect("clean shutdown");

    let preserved: Vec<_> = std::fs::read_dir(dir.path())
        .expect("list dir")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|entry| {
            entry
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("candidates.json.corrupt-"))
        })
        .collect();
    assert_eq!(preserved.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&preserved[0]).expect("read preserved"),
        "{ not json"
    );
    let reloaded = JsonFileSink::new(&path).load().expect("file readable");
    assert_eq!(reloaded.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reviews_and_creates_all_land_in_the_final_snapshot() {
    let sink = Arc::new(MemorySink::default());
    let store = open_store(sink.clone()).await;
    let (id, evaluation) = store_failing_candidate(&store).await;
    let red = override_red_flags(&evaluation);
    assert!(red.len() > 1);

    let mut tasks = Vec::new();
    for flag_id in red.clone() {
        let store = store.clone();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            store
                .update_flag(
                    &id,
                    &flag_id,
                    FlagReview {
                        acknowledged: true,
                        overridden: true,
                    },
                )
                .await
                .expect("update succeeds")
                .expect("flag exists");
        }));
    }
    for _ in 0..4 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let candidate = eligible_candidate();
            let evaluation = FlaggingEngine::new().evaluate(&candidate);
            store.create(candidate, evaluation).await.expect("stored");
        }));
    }
    for task in tasks {
        task.await.expect("task completes");
    }

    let stored = store.get(&id).expect("read").expect("record exists");
    for flag_id in &red {
        assert!(stored.evaluation.flag(flag_id).expect("flag present").overridden);
    }
    assert!(stored.evaluation.is_eligible);
    assert_eq!(store.len().expect("len"), 5);
    assert_eq!(sink.last_snapshot(), Some(store.all().expect("all")));
}

#[tokio::test]
async fn seeded_records_are_served_without_a_write() {
    let seed_sink = Arc::new(MemorySink::default());
    let seed_store = open_store(seed_sink.clone()).await;
    let (id, _) = store_failing_candidate(&seed_store).await;
    let seed = seed_sink.last_snapshot().expect("seed written");

    let sink = Arc::new(MemorySink::with_records(seed));
    let store = open_store(sink.clone()).await;

    assert!(store.get(&id).expect("read").is_some());
    assert_eq!(sink.writes(), 0);
}

#[tokio::test]
async fn json_file_sink_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("candidates.json");

    let sink = Arc::new(JsonFileSink::new(&path));
    let store = open_store(sink).await;
    let candidate = failing_candidate();
    let evaluation = FlaggingEngine::new().evaluate(&candidate);
    let id = store.create(candidate, evaluation).await.expect("stored");
    store.shutdown().await.expect("clean shutdown");

    let reloaded = JsonFileSink::new(&path).load().expect("file readable");
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].id, id);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn json_file_sink_initialises_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("candidates.json");

    let records = JsonFileSink::new(&path).load().expect("load succeeds");

    assert!(records.is_empty());
    assert_eq!(
        std::fs::read_to_string(&path).expect("file created").trim(),
        "[]"
    );
}

#[test]
fn read_existing_leaves_a_missing_file_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("candidates.json");
    let sink = JsonFileSink::new(&path);

    assert!(sink.read_existing().expect("read succeeds").is_none());
    assert!(!path.exists());
    assert_eq!(sink.set_aside().expect("nothing to move"), None);
}

#[test]
fn json_file_sink_reports_corrupt_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("candidates.json");
    std::fs::write(&path, "{ not json").expect("write fixture");

    assert!(matches!(
        JsonFileSink::new(&path).load(),
        Err(RepositoryError::Unavailable(_))
    ));
}

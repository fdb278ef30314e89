use crate::cli::StoreArgs;
use crate::infra::file_backed_service;
use candidate_flagging::candidates::{
    EvaluationResult, FlagStatus, FlaggingEngine, FlaggingServiceError, IntakeGuard,
    JsonFileSink, StoredCandidate,
};
use candidate_flagging::config::{AppConfig, StorageConfig};
use candidate_flagging::error::AppError;
use chrono::Local;
use clap::Args;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Candidate submission as a JSON file
    pub(crate) input: PathBuf,
    /// Persist the evaluation to the candidate data file
    #[arg(long)]
    pub(crate) store: bool,
    #[command(flatten)]
    pub(crate) storage: StoreArgs,
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        input,
        store,
        storage,
    } = args;

    let raw = fs::read_to_string(&input)?;
    let payload: serde_json::Value = serde_json::from_str(&raw)?;

    if !store {
        let candidate = IntakeGuard::new()
            .candidate_from_payload(payload)
            .map_err(FlaggingServiceError::from)?;
        let evaluation = FlaggingEngine::new().evaluate(&candidate);
        println!("Evaluation of {} (not stored)", input.display());
        render_evaluation(&evaluation);
        return Ok(());
    }

    let storage = storage_config(storage.data_file)?;
    let service = file_backed_service(&storage).await;
    let outcome = service.submit(payload).await;
    let closed = service.shutdown().await;
    let (candidate_id, evaluation) = outcome?;
    closed?;

    println!(
        "Stored candidate {} in {}",
        candidate_id,
        storage.data_file.display()
    );
    render_evaluation(&evaluation);
    Ok(())
}

pub(crate) fn run_candidate_list(args: StoreArgs) -> Result<(), AppError> {
    let records = load_records(args)?;
    if records.is_empty() {
        println!("No stored candidates");
        return Ok(());
    }

    println!("Stored candidates ({})", records.len());
    for record in &records {
        let unresolved = record
            .evaluation
            .red_flags()
            .filter(|flag| !flag.overridden)
            .count();
        println!(
            "- {} | {} | {} | {} | {} unresolved red flag(s)",
            record.id,
            record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.display_name(),
            verdict_label(&record.evaluation),
            unresolved
        );
    }
    Ok(())
}

pub(crate) fn run_candidate_show(candidate_id: &str, args: StoreArgs) -> Result<(), AppError> {
    let records = load_records(args)?;
    let record = records
        .iter()
        .find(|record| record.id.0 == candidate_id)
        .ok_or_else(|| AppError::NotFound(format!("candidate {candidate_id}")))?;

    println!("Candidate {} ({})", record.id, record.display_name());
    println!(
        "Evaluated {}",
        record.timestamp.with_timezone(&Local).to_rfc3339()
    );
    if let Some(email) = &record.candidate.email {
        println!("Email: {email}");
    }
    render_evaluation(&record.evaluation);
    Ok(())
}

fn storage_config(data_file: Option<PathBuf>) -> Result<StorageConfig, AppError> {
    let mut storage = AppConfig::load()?.storage;
    if let Some(data_file) = data_file {
        storage.data_file = data_file;
    }
    Ok(storage)
}

fn load_records(args: StoreArgs) -> Result<Vec<StoredCandidate>, AppError> {
    let storage = storage_config(args.data_file)?;
    let records = JsonFileSink::new(storage.data_file)
        .read_existing()
        .map_err(FlaggingServiceError::from)?;
    Ok(records.unwrap_or_default())
}

fn verdict_label(evaluation: &EvaluationResult) -> &'static str {
    if evaluation.is_eligible {
        "eligible"
    } else {
        "not eligible"
    }
}

pub(crate) fn render_evaluation(evaluation: &EvaluationResult) {
    println!("Verdict: {}", evaluation.summary());
    println!("\nFlags");
    for flag in &evaluation.flags {
        let marker = match flag.status {
            FlagStatus::Green => "GREEN",
            FlagStatus::Red => "RED",
        };
        let mut review = Vec::new();
        if flag.acknowledged {
            review.push("acknowledged");
        }
        if flag.overridden {
            review.push("overridden");
        }
        let review = if review.is_empty() {
            String::new()
        } else {
            format!(" [{}]", review.join(", "))
        };
        let id = flag
            .id
            .as_ref()
            .map(|id| format!(" ({id})"))
            .unwrap_or_default();
        println!(
            "- {:<5} {} / {}: {}{}{}",
            marker, flag.category, flag.field, flag.message, review, id
        );
    }
}

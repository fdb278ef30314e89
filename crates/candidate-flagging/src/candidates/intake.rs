use serde_json::Value;

use super::domain::CandidateRecord;

/// Fields a submission must carry before it is worth evaluating at all.
pub const REQUIRED_SUBMISSION_FIELDS: [&str; 5] =
    ["firstName", "lastName", "email", "dateOfBirth", "legalStatus"];

/// Validation errors raised before evaluation.
#[derive(Debug, thiserror::Error)]
pub enum IntakeViolation {
    #[error("No candidate data provided")]
    EmptySubmission,
    #[error("Missing required fields")]
    MissingFields(Vec<String>),
    #[error("candidate payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl IntakeViolation {
    pub fn missing_fields(&self) -> &[String] {
        match self {
            IntakeViolation::MissingFields(fields) => fields,
            _ => &[],
        }
    }
}

/// Gatekeeper turning raw JSON submissions into candidate records.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn new() -> Self {
        Self
    }

    /// Presence check first, then shape; a value counts as absent when it is null,
    /// `false`, zero, or an empty string.
    pub fn candidate_from_payload(&self, payload: Value) -> Result<CandidateRecord, IntakeViolation> {
        let Value::Object(fields) = &payload else {
            return Err(IntakeViolation::EmptySubmission);
        };
        if fields.is_empty() {
            return Err(IntakeViolation::EmptySubmission);
        }

        let missing: Vec<String> = REQUIRED_SUBMISSION_FIELDS
            .iter()
            .filter(|name| fields.get(**name).map_or(true, is_blank))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IntakeViolation::MissingFields(missing));
        }

        Ok(serde_json::from_value(payload)?)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

mod policy;
mod rules;
mod thresholds;

pub use policy::is_eligible;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::domain::{CandidateRecord, FlagId};

/// A single rule check; appends zero or more flags for the candidate.
pub(crate) type RuleCheck = fn(&CandidateRecord, &mut Vec<Flag>);

/// Stateless evaluator running the fixed rule battery against a candidate.
pub struct FlaggingEngine {
    checks: Vec<RuleCheck>,
}

impl Default for FlaggingEngine {
    fn default() -> Self {
        Self {
            checks: rules::STANDARD_BATTERY.to_vec(),
        }
    }
}

impl FlaggingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_checks(checks: Vec<RuleCheck>) -> Self {
        Self { checks }
    }

    /// Run every check in category order and derive the verdict.
    ///
    /// A check that cannot complete collapses the whole evaluation into a single
    /// system-error flag rather than returning a partial flag list.
    pub fn evaluate(&self, candidate: &CandidateRecord) -> EvaluationResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut flags = Vec::new();
            for check in &self.checks {
                check(candidate, &mut flags);
            }
            flags
        }));

        match outcome {
            Ok(flags) if flags.is_empty() => {
                error!("rule battery produced no flags");
                EvaluationResult::system_error("no findings were produced")
            }
            Ok(flags) => {
                let is_eligible = is_eligible(&flags);
                debug!(flag_count = flags.len(), is_eligible, "candidate evaluated");
                EvaluationResult { is_eligible, flags }
            }
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                error!(%reason, "candidate evaluation aborted");
                EvaluationResult::system_error(&reason)
            }
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown failure".to_string()
    }
}

/// Pass/fail outcome of a check, named after the rubric's traffic-light vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagStatus {
    Red,
    Green,
}

/// Groups of related checks, in the order their flags are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagCategory {
    PersonalInformation,
    MedicalEducation,
    Examinations,
    LegalStatus,
    DrivingLicense,
    PracticeHours,
    TdmResults,
    EnglishProficiency,
    PostgradTraining,
    Rotations,
    ImpairmentToPractice,
    SystemError,
}

impl FlagCategory {
    pub const fn ordered() -> [Self; 11] {
        [
            Self::PersonalInformation,
            Self::MedicalEducation,
            Self::Examinations,
            Self::LegalStatus,
            Self::DrivingLicense,
            Self::PracticeHours,
            Self::TdmResults,
            Self::EnglishProficiency,
            Self::PostgradTraining,
            Self::Rotations,
            Self::ImpairmentToPractice,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PersonalInformation => "Personal Information",
            Self::MedicalEducation => "Medical Education",
            Self::Examinations => "Examinations",
            Self::LegalStatus => "Legal Status",
            Self::DrivingLicense => "Driving License",
            Self::PracticeHours => "Practice Hours",
            Self::TdmResults => "TDM Results",
            Self::EnglishProficiency => "English Proficiency",
            Self::PostgradTraining => "Postgrad Training",
            Self::Rotations => "Rotations",
            Self::ImpairmentToPractice => "Impairment to Practice",
            Self::SystemError => "System Error",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .chain([Self::SystemError])
            .find(|category| category.label() == label)
    }
}

/// One finding of one rule check plus its reviewer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FlagId>,
    pub category: String,
    pub field: String,
    pub status: FlagStatus,
    pub message: String,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub overridden: bool,
}

impl Flag {
    pub fn new(
        category: FlagCategory,
        field: impl Into<String>,
        status: FlagStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            category: category.label().to_string(),
            field: field.into(),
            status,
            message: message.into(),
            acknowledged: false,
            overridden: false,
        }
    }

    pub(crate) fn green(
        category: FlagCategory,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(category, field, FlagStatus::Green, message)
    }

    pub(crate) fn red(
        category: FlagCategory,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(category, field, FlagStatus::Red, message)
    }

    pub fn is_red(&self) -> bool {
        self.status == FlagStatus::Red
    }
}

/// Ordered flags for one candidate and the verdict derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub is_eligible: bool,
    pub flags: Vec<Flag>,
}

impl EvaluationResult {
    /// Result substituted when the rule battery could not run to completion.
    pub fn system_error(reason: &str) -> Self {
        Self {
            is_eligible: false,
            flags: vec![Flag::red(
                FlagCategory::SystemError,
                "evaluation",
                format!("Error processing candidate data: {reason}"),
            )],
        }
    }

    /// Re-derive `is_eligible` from the current flag state.
    pub fn recompute_eligibility(&mut self) -> bool {
        self.is_eligible = is_eligible(&self.flags);
        self.is_eligible
    }

    pub fn red_flags(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter().filter(|flag| flag.is_red())
    }

    pub fn flag(&self, id: &FlagId) -> Option<&Flag> {
        self.flags.iter().find(|flag| flag.id.as_ref() == Some(id))
    }

    pub fn summary(&self) -> String {
        let active = self
            .red_flags()
            .filter(|flag| !flag.overridden)
            .count();
        if self.is_eligible {
            format!("eligible ({} flags)", self.flags.len())
        } else {
            format!("not eligible: {active} unresolved red flag(s)")
        }
    }
}

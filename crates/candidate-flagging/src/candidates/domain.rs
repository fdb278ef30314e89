use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for stored candidate records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for a single flag, unique within its candidate record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(pub String);

impl FlagId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Applicant snapshot submitted for a practice-ready eligibility assessment.
///
/// Every field tolerates absence and wrong JSON types so the evaluator, not the
/// decoder, decides what an unusable value means: the affected check fails and
/// the rest of the battery still runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_birth: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub legal_status: Option<LegalStatus>,

    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub medical_school: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub degree: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::year",
        skip_serializing_if = "Option::is_none"
    )]
    pub graduation_year: Option<u16>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub language_of_education: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub nac_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub mccqe1_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub mccqe2_date: Option<String>,

    #[serde(
        rename = "writtenTDM",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub written_tdm: Option<WrittenTdmResult>,

    #[serde(default, deserialize_with = "lenient::confirmed")]
    pub has_canadian_driving_license: bool,
    #[serde(default, deserialize_with = "lenient::count")]
    pub practice_hours: u32,

    #[serde(
        default,
        deserialize_with = "lenient::english",
        skip_serializing_if = "Option::is_none"
    )]
    pub english_proficiency: Option<EnglishProficiency>,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub post_grad_training: Option<PostGradTraining>,

    #[serde(default, deserialize_with = "lenient::count")]
    pub rotations_completed: u32,
    #[serde(default, deserialize_with = "lenient::disclosed")]
    pub has_impairment_to_practice: bool,
}

/// Immigration status declared by the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegalStatus {
    #[serde(rename = "Permanent Resident")]
    PermanentResident,
    #[serde(rename = "Canadian Citizen")]
    CanadianCitizen,
    #[serde(rename = "Other", other)]
    Other,
}

impl LegalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LegalStatus::PermanentResident => "Permanent Resident",
            LegalStatus::CanadianCitizen => "Canadian Citizen",
            LegalStatus::Other => "Other",
        }
    }
}

/// Outcome of the written Therapeutics Decision-Making exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrittenTdmResult {
    Passed,
    Failed,
    #[serde(rename = "Not Taken", other)]
    NotTaken,
}

/// English-proficiency evidence, discriminated by the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnglishProficiency {
    #[serde(rename = "IELTS")]
    Ielts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<ProficiencyScore>,
    },
    #[serde(rename = "CELPIP")]
    Celpip {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<ProficiencyScore>,
    },
    #[serde(rename = "OET")]
    Oet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<ProficiencyScore>,
    },
    #[serde(rename = "Recent Practice", rename_all = "camelCase")]
    RecentPractice {
        #[serde(
            default,
            deserialize_with = "lenient::decimal",
            skip_serializing_if = "Option::is_none"
        )]
        recent_practice_percentage: Option<f64>,
    },
    /// Any assessment type the rubric does not know how to grade.
    #[serde(other)]
    Unrecognized,
}

impl EnglishProficiency {
    pub const fn label(&self) -> &'static str {
        match self {
            EnglishProficiency::Ielts { .. } => "IELTS",
            EnglishProficiency::Celpip { .. } => "CELPIP",
            EnglishProficiency::Oet { .. } => "OET",
            EnglishProficiency::RecentPractice { .. } => "Recent Practice",
            EnglishProficiency::Unrecognized => "unrecognized",
        }
    }
}

/// Test score as submitted by intake forms, which send either JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProficiencyScore {
    Numeric(f64),
    Text(String),
    /// Any other JSON value; never meets a threshold.
    Other(serde_json::Value),
}

impl ProficiencyScore {
    /// Numeric reading of the score; text that does not parse as a decimal yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ProficiencyScore::Numeric(value) => Some(*value).filter(|value| !value.is_nan()),
            ProficiencyScore::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| !value.is_nan()),
            ProficiencyScore::Other(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ProficiencyScore::Text(raw) => Some(raw.as_str()),
            ProficiencyScore::Numeric(_) | ProficiencyScore::Other(_) => None,
        }
    }
}

/// Postgraduate residency and independent practice history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostGradTraining {
    #[serde(default, deserialize_with = "lenient::confirmed")]
    pub completed: bool,
    #[serde(default, deserialize_with = "lenient::count")]
    pub months: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub independent_practice_months: u32,
}

/// Field decoders that never reject a submission.
///
/// Numbers also arrive as numeric strings. Anything unusable decodes to the
/// value the matching rule treats as failing.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::EnglishProficiency;

    fn number(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(raw) => raw.trim().parse::<f64>().ok(),
            _ => None,
        };
        number.filter(|number| number.is_finite())
    }

    fn whole(value: &Value) -> Option<u32> {
        number(value).map(|number| number.clamp(0.0, f64::from(u32::MAX)).floor() as u32)
    }

    pub(super) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Some(text)),
            _ => Ok(None),
        }
    }

    pub(super) fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(whole(&value).unwrap_or(0))
    }

    pub(super) fn year<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(whole(&value).and_then(|year| u16::try_from(year).ok()))
    }

    pub(super) fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(number(&value))
    }

    /// Only a literal `true` confirms a requirement.
    pub(super) fn confirmed<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
    }

    /// Only a literal `false` (or null) rules a disclosure out.
    pub(super) fn disclosed<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(!matches!(
            Value::deserialize(deserializer)?,
            Value::Bool(false) | Value::Null
        ))
    }

    pub(super) fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => Ok(serde_json::from_value(value).ok()),
        }
    }

    /// A present but undecodable assessment is graded as unrecognized rather than missing.
    pub(super) fn english<'de, D>(deserializer: D) -> Result<Option<EnglishProficiency>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => Ok(Some(
                serde_json::from_value(value).unwrap_or(EnglishProficiency::Unrecognized),
            )),
        }
    }
}

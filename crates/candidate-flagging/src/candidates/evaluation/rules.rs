use super::super::domain::{
    CandidateRecord, EnglishProficiency, LegalStatus, PostGradTraining, WrittenTdmResult,
};
use super::thresholds::{
    MIN_CELPIP_SCORE, MIN_IELTS_SCORE, MIN_OET_GRADE, MIN_PRACTICE_HOURS,
    MIN_RECENT_PRACTICE_PERCENTAGE, MIN_ROTATIONS, POSTGRAD_PATHWAYS, TWO_YEAR_POSTGRAD_MONTHS,
};
use super::{Flag, FlagCategory, RuleCheck};

/// The fixed battery, in emission order.
pub(crate) const STANDARD_BATTERY: [RuleCheck; 9] = [
    required_fields,
    legal_status,
    driving_license,
    practice_hours,
    written_tdm,
    english_proficiency,
    postgrad_training,
    rotations,
    impairment,
];

fn missing_text(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Fail-only completeness check; present fields emit nothing.
pub(crate) fn required_fields(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let personal = [
        ("firstName", missing_text(&candidate.first_name)),
        ("lastName", missing_text(&candidate.last_name)),
        ("email", missing_text(&candidate.email)),
        ("dateOfBirth", missing_text(&candidate.date_of_birth)),
    ];
    let education = [
        ("medicalSchool", missing_text(&candidate.medical_school)),
        ("degree", missing_text(&candidate.degree)),
        (
            "graduationYear",
            candidate.graduation_year.map_or(true, |year| year == 0),
        ),
        (
            "languageOfEducation",
            missing_text(&candidate.language_of_education),
        ),
    ];
    let examinations = [
        ("nacDate", missing_text(&candidate.nac_date)),
        ("mccqe1Date", missing_text(&candidate.mccqe1_date)),
        ("mccqe2Date", missing_text(&candidate.mccqe2_date)),
    ];

    let groups: [(FlagCategory, &[(&str, bool)]); 3] = [
        (FlagCategory::PersonalInformation, &personal),
        (FlagCategory::MedicalEducation, &education),
        (FlagCategory::Examinations, &examinations),
    ];

    for (category, fields) in groups {
        for (field, missing) in fields {
            if *missing {
                flags.push(Flag::red(category, *field, format!("{field} is required")));
            }
        }
    }
}

pub(crate) fn legal_status(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let flag = match candidate.legal_status {
        Some(LegalStatus::PermanentResident | LegalStatus::CanadianCitizen) => Flag::green(
            FlagCategory::LegalStatus,
            "legalStatus",
            "Candidate meets legal status requirement",
        ),
        Some(LegalStatus::Other) | None => Flag::red(
            FlagCategory::LegalStatus,
            "legalStatus",
            "Candidate must be a Permanent Resident or Canadian Citizen",
        ),
    };
    flags.push(flag);
}

pub(crate) fn driving_license(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let flag = if candidate.has_canadian_driving_license {
        Flag::green(
            FlagCategory::DrivingLicense,
            "hasCanadianDrivingLicense",
            "Candidate has a valid Canadian driving license",
        )
    } else {
        Flag::red(
            FlagCategory::DrivingLicense,
            "hasCanadianDrivingLicense",
            "Candidate must have a valid Canadian driving license",
        )
    };
    flags.push(flag);
}

pub(crate) fn practice_hours(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let flag = if candidate.practice_hours >= MIN_PRACTICE_HOURS {
        Flag::green(
            FlagCategory::PracticeHours,
            "practiceHours",
            "Candidate has sufficient practice hours",
        )
    } else {
        Flag::red(
            FlagCategory::PracticeHours,
            "practiceHours",
            format!("Candidate must have at least {MIN_PRACTICE_HOURS} hours of in-person practice"),
        )
    };
    flags.push(flag);
}

pub(crate) fn written_tdm(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let flag = if candidate.written_tdm == Some(WrittenTdmResult::Passed) {
        Flag::green(
            FlagCategory::TdmResults,
            "writtenTDM",
            "Candidate has passed the Written TDM test",
        )
    } else {
        Flag::red(
            FlagCategory::TdmResults,
            "writtenTDM",
            "Candidate must pass the Written TDM test",
        )
    };
    flags.push(flag);
}

pub(crate) fn english_proficiency(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    const FIELD: &str = "englishProficiency";

    let Some(proficiency) = &candidate.english_proficiency else {
        flags.push(Flag::red(
            FlagCategory::EnglishProficiency,
            FIELD,
            "English proficiency information is required",
        ));
        return;
    };

    let meets = match proficiency {
        EnglishProficiency::Ielts { score } => score
            .as_ref()
            .and_then(|score| score.as_number())
            .is_some_and(|value| value >= MIN_IELTS_SCORE),
        EnglishProficiency::Celpip { score } => score
            .as_ref()
            .and_then(|score| score.as_number())
            .is_some_and(|value| value >= MIN_CELPIP_SCORE),
        // Grades compare as plain strings, so "C" passes and "A" does not.
        EnglishProficiency::Oet { score } => score
            .as_ref()
            .and_then(|score| score.as_text())
            .is_some_and(|grade| grade >= MIN_OET_GRADE),
        EnglishProficiency::RecentPractice {
            recent_practice_percentage,
        } => recent_practice_percentage.unwrap_or(0.0) >= MIN_RECENT_PRACTICE_PERCENTAGE,
        EnglishProficiency::Unrecognized => {
            flags.push(Flag::red(
                FlagCategory::EnglishProficiency,
                FIELD,
                "English proficiency assessment type is not recognized; expected IELTS, CELPIP, OET or Recent Practice",
            ));
            return;
        }
    };

    let flag = if meets {
        Flag::green(
            FlagCategory::EnglishProficiency,
            FIELD,
            "Candidate meets English proficiency requirements",
        )
    } else {
        Flag::red(
            FlagCategory::EnglishProficiency,
            FIELD,
            format!(
                "Candidate does not meet English proficiency requirements ({})",
                proficiency.label()
            ),
        )
    };
    flags.push(flag);
}

fn meets_postgrad_pathway(training: &PostGradTraining) -> bool {
    POSTGRAD_PATHWAYS.iter().any(|&(months, independent)| {
        training.months >= months && training.independent_practice_months >= independent
    })
}

/// Two independent flags so a reviewer can override either milestone alone.
pub(crate) fn postgrad_training(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let Some(training) = &candidate.post_grad_training else {
        flags.push(Flag::red(
            FlagCategory::PostgradTraining,
            "postGradTraining",
            "Postgrad training information is required",
        ));
        return;
    };

    if meets_postgrad_pathway(training) {
        flags.push(Flag::green(
            FlagCategory::PostgradTraining,
            "postGradTraining",
            "Candidate meets postgrad training requirements",
        ));
    } else {
        flags.push(Flag::red(
            FlagCategory::PostgradTraining,
            "postGradTraining",
            "Candidate must have completed either 24 months PG + 24 months independent practice OR 12 months PG + 36 months independent practice",
        ));
    }

    if training.months >= TWO_YEAR_POSTGRAD_MONTHS {
        flags.push(Flag::green(
            FlagCategory::PostgradTraining,
            "twoYearPostgradCompleted",
            "Candidate has completed 2 years of postgrad training",
        ));
    } else {
        flags.push(Flag::red(
            FlagCategory::PostgradTraining,
            "twoYearPostgradCompleted",
            "Candidate must complete 2 years of postgrad training",
        ));
    }
}

pub(crate) fn rotations(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let flag = if candidate.rotations_completed >= MIN_ROTATIONS {
        Flag::green(
            FlagCategory::Rotations,
            "rotationsCompleted",
            format!("Candidate has completed the required {MIN_ROTATIONS} rotations"),
        )
    } else {
        Flag::red(
            FlagCategory::Rotations,
            "rotationsCompleted",
            format!("Candidate must complete {MIN_ROTATIONS} rotations"),
        )
    };
    flags.push(flag);
}

pub(crate) fn impairment(candidate: &CandidateRecord, flags: &mut Vec<Flag>) {
    let flag = if candidate.has_impairment_to_practice {
        Flag::red(
            FlagCategory::ImpairmentToPractice,
            "hasImpairmentToPractice",
            "Candidate has impairment to practice",
        )
    } else {
        Flag::green(
            FlagCategory::ImpairmentToPractice,
            "hasImpairmentToPractice",
            "Candidate has no impairment to practice",
        )
    };
    flags.push(flag);
}

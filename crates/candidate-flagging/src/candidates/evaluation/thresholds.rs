/// Minimum in-person clinical practice hours.
pub(crate) const MIN_PRACTICE_HOURS: u32 = 720;

pub(crate) const MIN_IELTS_SCORE: f64 = 7.0;
pub(crate) const MIN_CELPIP_SCORE: f64 = 9.0;
/// Compared lexically against the submitted OET grade.
pub(crate) const MIN_OET_GRADE: &str = "B";
pub(crate) const MIN_RECENT_PRACTICE_PERCENTAGE: f64 = 50.0;

/// Two accepted pathways: (postgraduate months, independent practice months).
pub(crate) const POSTGRAD_PATHWAYS: [(u32, u32); 2] = [(24, 24), (12, 36)];
pub(crate) const TWO_YEAR_POSTGRAD_MONTHS: u32 = 24;

pub(crate) const MIN_ROTATIONS: u32 = 7;

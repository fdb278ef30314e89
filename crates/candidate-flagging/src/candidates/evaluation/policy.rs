use super::{Flag, FlagStatus};

/// Overall verdict: eligible unless a red flag remains that a reviewer has not overridden.
///
/// Acknowledgement never participates; only `overridden` can neutralise a red flag.
pub fn is_eligible(flags: &[Flag]) -> bool {
    !flags
        .iter()
        .any(|flag| flag.status == FlagStatus::Red && !flag.overridden)
}

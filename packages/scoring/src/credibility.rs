//! Auditor credibility from their verified/flagged history.

use crate::config::ScoringConfig;

/// Credibility of an auditor in `[credibility_floor, 1.0)`.
///
/// `verified / (verified + flagged + 1)`, floored. The `+ 1` keeps the
/// denominator positive and means credibility only approaches 1.0 as the
/// verified history grows.
#[must_use]
pub fn credibility(config: &ScoringConfig, verified_count: u32, flagged_count: u32) -> f64 {
    let verified = f64::from(verified_count);
    let total = verified + f64::from(flagged_count) + 1.0;
    (verified / total).max(config.credibility_floor)
}

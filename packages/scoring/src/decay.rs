//! Exponential time decay of incident weight.
//!
//! Decay is the only score input that is not a stored snapshot: it is a
//! live function of "now", so it is re-evaluated on every recompute.

use chrono::{DateTime, Utc};

use crate::config::ScoringConfig;

/// Whole days elapsed between `created_at` and `now`.
///
/// Negative ages (clock skew, future timestamps) are clamped to zero.
#[must_use]
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = (now - created_at).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// `e^(-decay_rate * age_days)`.
#[must_use]
pub fn decay(config: &ScoringConfig, age_days: u32) -> f64 {
    (-config.decay_rate * f64::from(age_days)).exp()
}

/// Decay factor for an incident created at `created_at`.
#[must_use]
pub fn decay_since(config: &ScoringConfig, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    decay(config, age_in_days(created_at, now))
}

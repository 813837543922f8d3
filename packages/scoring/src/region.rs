//! Region aggregation.
//!
//! Stats are always rebuilt from the full incident set. Nothing here is
//! patched incrementally, so calling [`aggregate`] twice with the same
//! incidents, cluster factor and `now` yields bit-identical results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use safety_map_incident_models::{Incident, Severity};
use safety_map_region_models::{MAX_SAFETY_SCORE, RegionStats};

use crate::config::ScoringConfig;
use crate::contribution;

/// Integer severity score used for the region's mean severity.
#[must_use]
pub fn severity_score(config: &ScoringConfig, severity: &Severity) -> u8 {
    config
        .severity
        .scores
        .get(severity)
        .unwrap_or(config.severity.unknown_score)
}

/// Buckets a mean severity score back into a severity level.
#[must_use]
pub fn bucket_severity(config: &ScoringConfig, mean_score: f64) -> Severity {
    let buckets = &config.severity.buckets;
    if mean_score <= buckets.low {
        Severity::Low
    } else if mean_score <= buckets.medium {
        Severity::Medium
    } else if mean_score <= buckets.high {
        Severity::High
    } else {
        Severity::Critical
    }
}

/// Scales a raw score onto 0-100.
///
/// This is a saturating linear map, not a probability: every raw score at
/// or above `max_score_ceiling` reads as 100.
#[must_use]
pub fn normalize(config: &ScoringConfig, raw_score: f64) -> f64 {
    if raw_score.is_nan() || config.max_score_ceiling.is_nan() || config.max_score_ceiling <= 0.0
    {
        return 0.0;
    }
    (raw_score / config.max_score_ceiling * 100.0).clamp(0.0, 100.0)
}

/// Legacy 0-10 safety score (10 = safest) derived from the normalized score.
#[must_use]
pub fn legacy_safety_score(normalized_score: f64) -> f64 {
    (MAX_SAFETY_SCORE - normalized_score / 10.0).max(0.0)
}

/// Rebuilds a region's stats from its linked incidents.
///
/// Each incident's contribution is re-evaluated at `now` rather than read
/// from the stored snapshot, since time decay moves with the clock.
#[must_use]
pub fn aggregate(
    config: &ScoringConfig,
    incidents: &[Incident],
    cluster_factor: f64,
    now: DateTime<Utc>,
) -> RegionStats {
    if incidents.is_empty() {
        return RegionStats::default();
    }

    let mut severity_total = 0u32;
    let mut high_severity_count = 0u32;
    let mut incident_types: BTreeMap<String, u32> = BTreeMap::new();
    let mut total_contribution = 0.0;

    for incident in incidents {
        severity_total += u32::from(severity_score(config, &incident.severity));
        if incident.severity.is_high() {
            high_severity_count += 1;
        }
        *incident_types
            .entry(incident.incident_type.clone())
            .or_insert(0) += 1;
        total_contribution += contribution::evaluate(config, incident, now).contribution_score;
    }

    let incident_count = u32::try_from(incidents.len()).unwrap_or(u32::MAX);
    let mean_score = f64::from(severity_total) / f64::from(incident_count);

    let raw_score = cluster_factor * total_contribution;
    let normalized_score = normalize(config, raw_score);

    RegionStats {
        incident_count,
        average_severity: Some(bucket_severity(config, mean_score)),
        high_severity_count,
        incident_types,
        raw_score,
        normalized_score,
        safety_score: legacy_safety_score(normalized_score),
    }
}

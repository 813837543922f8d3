//! Per-incident contribution score.

use chrono::{DateTime, Utc};
use safety_map_incident_models::{Audit, Incident, Severity};
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::decay::decay_since;

/// The four derived score fields of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Weight from the severity table.
    pub initial_weight: f64,
    /// Mean audit multiplier, exactly 1.0 without audits.
    pub effective_multiplier: f64,
    /// Age decay at the evaluation time.
    pub time_decay_factor: f64,
    /// Product of the three factors above.
    pub contribution_score: f64,
}

impl Contribution {
    /// The score fields as last written onto `incident`.
    #[must_use]
    pub const fn stored(incident: &Incident) -> Self {
        Self {
            initial_weight: incident.initial_weight,
            effective_multiplier: incident.effective_multiplier,
            time_decay_factor: incident.time_decay_factor,
            contribution_score: incident.contribution_score,
        }
    }
}

/// Initial weight for a severity. Unknown severities get
/// `unknown_weight` instead of failing.
#[must_use]
pub fn severity_weight(config: &ScoringConfig, severity: &Severity) -> f64 {
    config
        .severity
        .weights
        .get(severity)
        .unwrap_or(config.severity.unknown_weight)
}

/// Mean of the stored audit multipliers, 1.0 for an empty list.
#[must_use]
pub fn effective_multiplier(audits: &[Audit]) -> f64 {
    if audits.is_empty() {
        return 1.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = audits.len() as f64;
    audits.iter().map(|a| a.multiplier).sum::<f64>() / count
}

/// Evaluates an incident's contribution at `now` without modifying it.
#[must_use]
pub fn evaluate(config: &ScoringConfig, incident: &Incident, now: DateTime<Utc>) -> Contribution {
    let initial_weight = severity_weight(config, &incident.severity);
    let effective_multiplier = effective_multiplier(&incident.audits);
    let time_decay_factor = decay_since(config, incident.created_at, now);

    Contribution {
        initial_weight,
        effective_multiplier,
        time_decay_factor,
        contribution_score: initial_weight * effective_multiplier * time_decay_factor,
    }
}

/// Recomputes and writes all four score fields onto `incident`.
pub fn apply(config: &ScoringConfig, incident: &mut Incident, now: DateTime<Utc>) -> Contribution {
    let contribution = evaluate(config, incident, now);

    incident.initial_weight = contribution.initial_weight;
    incident.effective_multiplier = contribution.effective_multiplier;
    incident.time_decay_factor = contribution.time_decay_factor;
    incident.contribution_score = contribution.contribution_score;

    log::debug!(
        "incident {} contribution: {:.4} = {} * {:.4} * {:.4}",
        incident.id,
        contribution.contribution_score,
        contribution.initial_weight,
        contribution.effective_multiplier,
        contribution.time_decay_factor,
    );

    contribution
}

//! Tunable scoring constants.
//!
//! Every constant the scoring functions use is carried by an explicit
//! [`ScoringConfig`] value instead of module-level state, so callers (and
//! tests) can vary them deterministically. The `Default` values are the
//! production tuning.

use safety_map_incident_models::Severity;
use serde::{Deserialize, Serialize};

/// Per-severity lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityTable<T> {
    /// Value for `low`.
    pub low: T,
    /// Value for `medium`.
    pub medium: T,
    /// Value for `high`.
    pub high: T,
    /// Value for `critical`.
    pub critical: T,
}

impl<T: Copy> SeverityTable<T> {
    /// Looks up a known severity. Returns `None` for [`Severity::Other`].
    #[must_use]
    pub const fn get(&self, severity: &Severity) -> Option<T> {
        match severity {
            Severity::Low => Some(self.low),
            Severity::Medium => Some(self.medium),
            Severity::High => Some(self.high),
            Severity::Critical => Some(self.critical),
            Severity::Other(_) => None,
        }
    }
}

/// Upper bounds (inclusive) used to bucket a mean severity score back into
/// a severity level. Anything above `high` is critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBuckets {
    /// Highest mean still reported as `low`.
    pub low: f64,
    /// Highest mean still reported as `medium`.
    pub medium: f64,
    /// Highest mean still reported as `high`.
    pub high: f64,
}

/// Severity-related tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    /// Initial contribution weight per severity.
    pub weights: SeverityTable<f64>,
    /// Weight for severities not in the table.
    pub unknown_weight: f64,
    /// Integer score per severity used for region statistics.
    pub scores: SeverityTable<u8>,
    /// Score for severities not in the table.
    pub unknown_score: u8,
    /// Thresholds mapping a mean score back to a severity.
    pub buckets: SeverityBuckets,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            weights: SeverityTable {
                low: 1.0,
                medium: 1.5,
                high: 2.5,
                critical: 4.0,
            },
            unknown_weight: 1.0,
            scores: SeverityTable {
                low: 1,
                medium: 2,
                high: 3,
                critical: 4,
            },
            unknown_score: 2,
            buckets: SeverityBuckets {
                low: 1.5,
                medium: 2.5,
                high: 3.5,
            },
        }
    }
}

/// Weights of the six environmental factors an auditor rates.
///
/// They sum to 1.0 so the weighted score stays in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalWeights {
    /// Street lighting.
    pub lighting: f64,
    /// Line-of-sight visibility.
    pub visibility: f64,
    /// Crowd activity.
    pub crowd_activity: f64,
    /// Walkpath condition.
    pub walkpath: f64,
    /// Access to transport.
    pub transport_access: f64,
    /// CCTV and police presence.
    pub cctv_police_presence: f64,
}

/// Lower bounds of the audit risk labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Scores at or above this are at least medium risk.
    pub medium: f64,
    /// Scores at or above this are high risk.
    pub high: f64,
}

/// Environmental assessment tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Factor weights.
    pub weights: EnvironmentalWeights,
    /// Risk label thresholds.
    pub risk: RiskThresholds,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            weights: EnvironmentalWeights {
                lighting: 0.25,
                visibility: 0.15,
                crowd_activity: 0.15,
                walkpath: 0.15,
                transport_access: 0.15,
                cctv_police_presence: 0.15,
            },
            risk: RiskThresholds {
                medium: 0.3,
                high: 0.6,
            },
        }
    }
}

/// All constants consumed by the scoring functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Maximum swing of an audit multiplier away from 1.0.
    pub alpha: f64,
    /// Exponential decay rate per day of incident age.
    pub decay_rate: f64,
    /// Raw score that maps to a normalized score of 100.
    pub max_score_ceiling: f64,
    /// Lowest credibility an auditor can have.
    pub credibility_floor: f64,
    /// Environmental score that leaves an incident's weight unchanged.
    pub neutral_s_env: f64,
    /// Environmental score assumed when an audit supplies none.
    pub default_s_env: f64,
    /// Cluster factor for regions created without one.
    pub default_cluster_factor: f64,
    /// Severity tables.
    pub severity: SeverityConfig,
    /// Environmental assessment tables.
    pub environment: EnvironmentConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            decay_rate: 0.01,
            max_score_ceiling: 100.0,
            credibility_floor: 0.1,
            neutral_s_env: 0.5,
            default_s_env: 1.0,
            default_cluster_factor: 1.0,
            severity: SeverityConfig::default(),
            environment: EnvironmentConfig::default(),
        }
    }
}

impl ScoringConfig {
    /// Checks that the constants keep every score total and in range.
    ///
    /// Returns one message per violated constraint; an empty list means the
    /// configuration is usable.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !(0.0..=0.5).contains(&self.alpha) {
            problems.push(format!("alpha must be within [0, 0.5], got {}", self.alpha));
        }
        if !is_non_negative(self.decay_rate) {
            problems.push(format!("decay_rate must be >= 0, got {}", self.decay_rate));
        }
        if self.max_score_ceiling.is_nan() || self.max_score_ceiling <= 0.0 {
            problems.push(format!(
                "max_score_ceiling must be > 0, got {}",
                self.max_score_ceiling
            ));
        }
        if !(0.0..=1.0).contains(&self.credibility_floor) {
            problems.push(format!(
                "credibility_floor must be within [0, 1], got {}",
                self.credibility_floor
            ));
        }
        for (name, value) in [
            ("neutral_s_env", self.neutral_s_env),
            ("default_s_env", self.default_s_env),
        ] {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if !is_non_negative(self.default_cluster_factor) {
            problems.push(format!(
                "default_cluster_factor must be >= 0, got {}",
                self.default_cluster_factor
            ));
        }

        let weights = &self.severity.weights;
        if [
            weights.low,
            weights.medium,
            weights.high,
            weights.critical,
            self.severity.unknown_weight,
        ]
        .iter()
        .any(|w| !is_non_negative(*w))
        {
            problems.push("severity weights must be >= 0".to_string());
        }

        let buckets = &self.severity.buckets;
        if !(buckets.low <= buckets.medium && buckets.medium <= buckets.high) {
            problems.push("severity buckets must be ascending".to_string());
        }

        let env = &self.environment.weights;
        let env_sum = env.lighting
            + env.visibility
            + env.crowd_activity
            + env.walkpath
            + env.transport_access
            + env.cctv_police_presence;
        if (env_sum - 1.0).abs() > 1e-9 {
            problems.push(format!("environmental weights must sum to 1, got {env_sum}"));
        }

        problems
    }
}

fn is_non_negative(value: f64) -> bool {
    !value.is_nan() && value >= 0.0
}

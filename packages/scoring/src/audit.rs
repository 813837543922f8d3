//! Audit multipliers and environmental assessments.
//!
//! An admin or NGO auditor rates the environment around an incident. The
//! rating (`s_env`, 0 = safe, 1 = confirmed dangerous) is turned into a
//! multiplier on the incident's weight, scaled by how credible the auditor
//! has been historically.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::config::{EnvironmentConfig, ScoringConfig};

/// `1 + (s_env - neutral) * 2 * alpha * credibility`.
///
/// A neutral rating yields exactly 1.0 regardless of credibility. Inputs
/// are clamped to their valid ranges and a NaN rating counts as neutral, so
/// the result always lies in `[1 - alpha, 1 + alpha]` for the default
/// neutral point of 0.5.
#[must_use]
pub fn audit_multiplier(config: &ScoringConfig, s_env: f64, credibility: f64) -> f64 {
    let s_env = if s_env.is_nan() {
        config.neutral_s_env
    } else {
        s_env.clamp(0.0, 1.0)
    };
    let credibility = if credibility.is_nan() {
        0.0
    } else {
        credibility.clamp(0.0, 1.0)
    };

    1.0 + (s_env - config.neutral_s_env) * 2.0 * config.alpha * credibility
}

/// Per-factor ratings submitted with an audit, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalAssessment {
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

impl Default for EnvironmentalAssessment {
    fn default() -> Self {
        Self {
            lighting: 0.5,
            visibility: 0.5,
            crowd_activity: 0.5,
            walkpath: 0.5,
            transport_access: 0.5,
            cctv_police_presence: 0.5,
        }
    }
}

impl EnvironmentalAssessment {
    /// Weighted environmental score, rounded to two decimals.
    ///
    /// Each factor is clamped to `[0, 1]` first (NaN counts as 0.5).
    #[must_use]
    pub fn s_env(&self, config: &EnvironmentConfig) -> f64 {
        let w = &config.weights;
        let score = [
            (self.lighting, w.lighting),
            (self.visibility, w.visibility),
            (self.crowd_activity, w.crowd_activity),
            (self.walkpath, w.walkpath),
            (self.transport_access, w.transport_access),
            (self.cctv_police_presence, w.cctv_police_presence),
        ]
        .into_iter()
        .map(|(value, weight)| {
            let value = if value.is_nan() { 0.5 } else { value.clamp(0.0, 1.0) };
            value * weight
        })
        .sum::<f64>();

        ((score * 100.0).round() / 100.0).clamp(0.0, 1.0)
    }
}

/// Human-facing label for an environmental score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    /// Below the medium threshold.
    Low,
    /// Between the medium and high thresholds.
    Medium,
    /// At or above the high threshold.
    High,
}

impl RiskLevel {
    /// Classifies an environmental score.
    #[must_use]
    pub fn classify(config: &EnvironmentConfig, s_env: f64) -> Self {
        if s_env < config.risk.medium {
            Self::Low
        } else if s_env < config.risk.high {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn neutral_rating_is_identity() {
        let config = ScoringConfig::default();
        for c in [0.0, 0.1, 0.37, 0.9, 1.0] {
            assert!(approx(audit_multiplier(&config, 0.5, c), 1.0));
        }
    }

    #[test]
    fn extremes_with_full_credibility() {
        let config = ScoringConfig::default();
        assert!(approx(audit_multiplier(&config, 1.0, 1.0), 1.5));
        assert!(approx(audit_multiplier(&config, 0.0, 1.0), 0.5));
    }

    #[test]
    fn low_credibility_dampens_swing() {
        let config = ScoringConfig::default();
        assert!(approx(audit_multiplier(&config, 1.0, 0.1), 1.05));
        assert!(approx(audit_multiplier(&config, 0.0, 0.1), 0.95));
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let config = ScoringConfig::default();
        assert!(approx(audit_multiplier(&config, 7.0, 3.0), 1.5));
        assert!(approx(audit_multiplier(&config, -2.0, 1.0), 0.5));
        assert!(approx(audit_multiplier(&config, f64::NAN, 1.0), 1.0));
    }

    #[test]
    fn multiplier_bounded() {
        let config = ScoringConfig::default();
        for s in 0..=10 {
            for c in 0..=10 {
                let m = audit_multiplier(&config, f64::from(s) / 10.0, f64::from(c) / 10.0);
                assert!((0.5..=1.5).contains(&m), "multiplier {m} out of range");
            }
        }
    }

    #[test]
    fn alpha_is_tunable() {
        let config = ScoringConfig {
            alpha: 0.25,
            ..ScoringConfig::default()
        };
        assert!(approx(audit_multiplier(&config, 1.0, 1.0), 1.25));
    }

    #[test]
    fn assessment_weighted_score() {
        let config = EnvironmentConfig::default();
        assert!(approx(EnvironmentalAssessment::default().s_env(&config), 0.5));

        let dark = EnvironmentalAssessment {
            lighting: 1.0,
            visibility: 1.0,
            ..EnvironmentalAssessment::default()
        };
        // 0.25 + 0.15 + 0.6 * 0.5
        assert!(approx(dark.s_env(&config), 0.7));

        let safe = EnvironmentalAssessment {
            lighting: 0.0,
            visibility: 0.0,
            crowd_activity: 0.0,
            walkpath: 0.0,
            transport_access: 0.0,
            cctv_police_presence: 0.0,
        };
        assert!(approx(safe.s_env(&config), 0.0));
    }

    #[test]
    fn risk_levels() {
        let config = EnvironmentConfig::default();
        assert_eq!(RiskLevel::classify(&config, 0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(&config, 0.3), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(&config, 0.59), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(&config, 0.6), RiskLevel::High);
    }
}

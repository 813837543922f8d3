//! Environmental audits and validation flags.

use safety_map_incident_models::{Actor, Audit, Auditor, Incident, Role};
use safety_map_scoring::{EnvironmentalAssessment, RiskLevel, audit_multiplier, credibility};
use serde::{Deserialize, Serialize};

use crate::{Engine, EngineError, RecomputeEvent};

/// An auditor's rating of an incident's surroundings.
///
/// `s_env` wins when both it and an `assessment` are given. With neither,
/// the configured `default_s_env` is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditSubmission {
    /// Overall environmental score in `[0, 1]`.
    #[serde(default)]
    pub s_env: Option<f64>,
    /// Per-factor ratings.
    #[serde(default)]
    pub assessment: Option<EnvironmentalAssessment>,
    /// Free-text notes, also stored as the incident's validation notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl Engine {
    /// Records an audit and rescores the incident.
    ///
    /// The multiplier is fixed at submission time from the auditor's
    /// current credibility. An admin audit sets the admin validation flag,
    /// an NGO audit the NGO flag.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the actor is not an admin or NGO, `s_env`
    /// is outside `[0, 1]`, the incident does not exist, or the store fails.
    pub async fn submit_audit(
        &self,
        auditor: &Actor,
        incident_id: &str,
        submission: AuditSubmission,
    ) -> Result<Incident, EngineError> {
        if !auditor.role.can_audit() {
            return Err(EngineError::Forbidden {
                role: auditor.role,
                action: "audit incidents",
            });
        }

        let scoring = &self.config.scoring;
        let s_env = match (submission.s_env, submission.assessment) {
            (Some(value), _) => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(EngineError::InvalidEnvironmentScore { value });
                }
                value
            }
            (None, Some(assessment)) => assessment.s_env(&scoring.environment),
            (None, None) => scoring.default_s_env,
        };

        let mut incident = self.get_incident(incident_id).await?;

        let record = self.auditor_record(auditor).await?;
        let credibility = credibility(scoring, record.verified_count, record.flagged_count);
        let multiplier = audit_multiplier(scoring, s_env, credibility);
        let now = self.now();

        incident.audits.push(Audit {
            auditor_id: auditor.id.clone(),
            auditor_email: auditor.email.clone(),
            s_env,
            notes: submission.notes.clone(),
            created_at: now,
            multiplier,
        });

        match auditor.role {
            Role::Admin => {
                incident.admin_validated = true;
                incident.admin_validated_by = Some(auditor.id.clone());
            }
            Role::Ngo => {
                incident.ngo_validated = true;
                incident.ngo_validated_by = Some(auditor.id.clone());
            }
            Role::User => {}
        }
        if submission.notes.is_some() {
            incident.validation_notes = submission.notes;
        }
        incident.updated_at = now;
        self.store.save_incident(&incident).await?;

        log::info!(
            "Audit of incident {} by {}: s_env {s_env:.2} ({} risk), credibility {credibility:.3}, multiplier {multiplier:.4}",
            incident.id,
            auditor.id,
            RiskLevel::classify(&scoring.environment, s_env),
        );

        self.finish(RecomputeEvent::AuditAdded {
            incident_id: incident.id,
        })
        .await
    }

    /// Clears the validation flag belonging to the actor's role.
    ///
    /// Audits are append-only and stay in place, so the score is unchanged
    /// apart from a decay refresh.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the actor is not an admin or NGO, the
    /// incident does not exist, or the store fails.
    pub async fn clear_validation(
        &self,
        actor: &Actor,
        incident_id: &str,
    ) -> Result<Incident, EngineError> {
        let mut incident = self.get_incident(incident_id).await?;

        match actor.role {
            Role::Admin => {
                incident.admin_validated = false;
                incident.admin_validated_by = None;
            }
            Role::Ngo => {
                incident.ngo_validated = false;
                incident.ngo_validated_by = None;
            }
            Role::User => {
                return Err(EngineError::Forbidden {
                    role: actor.role,
                    action: "clear validations",
                });
            }
        }
        if !incident.is_validated() {
            incident.validation_notes = None;
        }
        incident.updated_at = self.now();
        self.store.save_incident(&incident).await?;

        self.finish(RecomputeEvent::ValidationChanged {
            incident_id: incident.id,
        })
        .await
    }

    /// Stores an auditor's verified/flagged history.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the store fails.
    pub async fn register_auditor(&self, auditor: &Auditor) -> Result<(), EngineError> {
        self.store.save_auditor(auditor).await?;
        Ok(())
    }

    async fn auditor_record(&self, actor: &Actor) -> Result<Auditor, EngineError> {
        Ok(self
            .store
            .get_auditor(&actor.id)
            .await?
            .unwrap_or_else(|| Auditor {
                actor: actor.clone(),
                verified_count: 0,
                flagged_count: 0,
            }))
    }
}

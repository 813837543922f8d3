#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident report, audit, and severity types.
//!
//! An [`Incident`] is the document persisted for every crowdsourced report.
//! Its four score fields (`initial_weight`, `effective_multiplier`,
//! `time_decay_factor`, `contribution_score`) are derived by
//! `safety_map_scoring` and must never be written by request handlers.

use std::fmt;

use chrono::{DateTime, Utc};
use safety_map_geography_models::{AreaShape, AreaType};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Reported severity of an incident.
///
/// Severity strings that are not recognized are kept verbatim in
/// [`Severity::Other`] so that newer upstream values survive a round trip
/// and still score with the configured defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Severity {
    /// Minor concern.
    Low,
    /// Default for new reports.
    #[default]
    Medium,
    /// Serious risk.
    High,
    /// Immediate danger.
    Critical,
    /// Any severity string this version does not know.
    #[strum(default)]
    Other(String),
}

impl Severity {
    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Other(value) => value,
        }
    }

    /// Returns `true` for high and critical severities.
    #[must_use]
    pub const fn is_high(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns all known severity levels, least severe first.
    #[must_use]
    pub const fn known() -> [Self; 4] {
        [Self::Low, Self::Medium, Self::High, Self::Critical]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        // `EnumString` with a `default` variant never fails.
        Ok(value.parse().unwrap_or(Self::Other(value)))
    }
}

/// Lifecycle status of a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IncidentStatus {
    /// Awaiting review.
    #[default]
    Pending,
    /// Confirmed by a reviewer.
    Verified,
    /// The underlying problem was addressed.
    Resolved,
    /// Rejected as false or spam.
    Invalid,
}

/// Escalation level used to flag incidents for authorities.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AlertLevel {
    /// No escalation.
    #[default]
    Normal,
    /// Needs attention.
    Warning,
    /// Needs urgent attention.
    HighAlert,
}

/// Account role of a user acting on an incident.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    /// Regular reporter.
    User,
    /// Partner organization that audits reports.
    Ngo,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Whether this role may submit audits.
    #[must_use]
    pub const fn can_audit(self) -> bool {
        matches!(self, Self::Ngo | Self::Admin)
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id.
    pub id: String,
    /// User email, denormalized for display.
    pub email: String,
    /// Account role.
    pub role: Role,
}

/// An auditor together with the track record that determines credibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auditor {
    /// The auditing user.
    #[serde(flatten)]
    pub actor: Actor,
    /// Audits later confirmed as accurate.
    pub verified_count: u32,
    /// Audits later flagged as inaccurate.
    pub flagged_count: u32,
}

/// A comment on an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    pub id: String,
    /// Author id.
    pub user_id: String,
    /// Author email.
    pub user_email: String,
    /// Comment body.
    pub text: String,
    /// When the comment was posted.
    pub created_at: DateTime<Utc>,
}

/// An environmental audit of an incident by an admin or NGO.
///
/// Audits are append-only. `multiplier` captures the auditor's credibility
/// as of the audit and is never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    /// Auditor user id.
    pub auditor_id: String,
    /// Auditor email.
    pub auditor_email: String,
    /// Environmental risk assessment in `[0, 1]` (0 safe, 1 dangerous).
    pub s_env: f64,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When the audit was submitted.
    pub created_at: DateTime<Utc>,
    /// Multiplicative adjustment applied to the incident's weight.
    pub multiplier: f64,
}

/// A crowdsourced safety incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique incident id.
    pub id: String,
    /// Reporter id.
    pub user_id: String,
    /// Reporter email.
    pub user_email: String,
    /// Kind of area selected by the reporter.
    pub area_type: AreaType,
    /// Reported geometry.
    pub coordinates: AreaShape,
    /// Free-form category such as `gbv`, `unsafe_area` or `no_lights`.
    pub incident_type: String,
    /// Reporter's description.
    pub description: String,
    /// Current severity.
    #[serde(default)]
    pub severity: Severity,
    /// Lifecycle status.
    #[serde(default)]
    pub status: IncidentStatus,
    /// Escalation level.
    #[serde(default)]
    pub alert_level: AlertLevel,
    /// Uploaded image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Discussion thread.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Append-only audit history.
    #[serde(default)]
    pub audits: Vec<Audit>,
    /// Owning region, assigned once at creation.
    pub region_id: Option<String>,
    /// Reviewer that set the status to verified.
    pub verified_by: Option<String>,
    /// Reviewer that set the status to resolved.
    pub resolved_by: Option<String>,
    /// Whether authorities were notified.
    #[serde(default)]
    pub notified_authorities: bool,
    /// Legacy validation flag set by admin audits.
    #[serde(default)]
    pub admin_validated: bool,
    /// Admin that last validated.
    pub admin_validated_by: Option<String>,
    /// Legacy validation flag set by NGO audits.
    #[serde(default)]
    pub ngo_validated: bool,
    /// NGO user that last validated.
    pub ngo_validated_by: Option<String>,
    /// Notes from the most recent validation.
    pub validation_notes: Option<String>,
    /// Weight derived from severity.
    pub initial_weight: f64,
    /// Mean of audit multipliers, 1.0 without audits.
    pub effective_multiplier: f64,
    /// Exponential age decay at the last recompute.
    pub time_decay_factor: f64,
    /// `initial_weight * effective_multiplier * time_decay_factor`.
    pub contribution_score: f64,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Request payload for submitting a new report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    /// Kind of area.
    pub area_type: AreaType,
    /// Geometry.
    pub coordinates: AreaShape,
    /// Category.
    pub incident_type: String,
    /// Description.
    pub description: String,
    /// Severity, `medium` when absent.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Explicit region to join instead of geometric matching.
    #[serde(default)]
    pub region_id: Option<String>,
}

impl Incident {
    /// Builds a freshly submitted incident.
    ///
    /// Score fields start at their neutral values; the caller is expected to
    /// recompute them before persisting.
    #[must_use]
    pub fn new(id: String, reporter: &Actor, new: NewIncident, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: reporter.id.clone(),
            user_email: reporter.email.clone(),
            area_type: new.area_type,
            coordinates: new.coordinates,
            incident_type: new.incident_type,
            description: new.description,
            severity: new.severity.unwrap_or_default(),
            status: IncidentStatus::default(),
            alert_level: AlertLevel::default(),
            images: new.images,
            comments: Vec::new(),
            audits: Vec::new(),
            region_id: None,
            verified_by: None,
            resolved_by: None,
            notified_authorities: false,
            admin_validated: false,
            admin_validated_by: None,
            ngo_validated: false,
            ngo_validated_by: None,
            validation_notes: None,
            initial_weight: 1.0,
            effective_multiplier: 1.0,
            time_decay_factor: 1.0,
            contribution_score: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether either legacy validation flag is set.
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.admin_validated || self.ngo_validated
    }
}

/// Reviewer edits to an incident. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    /// New status.
    pub status: Option<IncidentStatus>,
    /// New severity.
    pub severity: Option<Severity>,
    /// New alert level.
    pub alert_level: Option<AlertLevel>,
}

impl IncidentUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.severity.is_none() && self.alert_level.is_none()
    }
}

/// Filters for listing incidents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilter {
    /// Only incidents with this status.
    pub status: Option<IncidentStatus>,
    /// Only incidents of this category.
    pub incident_type: Option<String>,
    /// Only incidents at this alert level.
    pub alert_level: Option<AlertLevel>,
    /// Maximum number of results.
    pub limit: usize,
}

impl Default for IncidentFilter {
    fn default() -> Self {
        Self {
            status: None,
            incident_type: None,
            alert_level: None,
            limit: 100,
        }
    }
}

impl IncidentFilter {
    /// Whether an incident passes every set filter.
    #[must_use]
    pub fn matches(&self, incident: &Incident) -> bool {
        self.status.is_none_or(|status| incident.status == status)
            && self
                .incident_type
                .as_deref()
                .is_none_or(|kind| incident.incident_type == kind)
            && self
                .alert_level
                .is_none_or(|level| incident.alert_level == level)
    }
}

/// Presentation form of an incident.
///
/// Adds the names older clients still read. They are aliases of the
/// current model, not a second weighting computation: `base_weight` is
/// `initial_weight` and `final_weight` is `contribution_score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentView {
    /// The incident itself.
    #[serde(flatten)]
    pub incident: Incident,
    /// Number of comments.
    pub comment_count: usize,
    /// Number of images.
    pub image_count: usize,
    /// Alias of `initial_weight`.
    pub base_weight: f64,
    /// Alias of `contribution_score`.
    pub final_weight: f64,
}

impl From<Incident> for IncidentView {
    fn from(incident: Incident) -> Self {
        Self {
            comment_count: incident.comments.len(),
            image_count: incident.images.len(),
            base_weight: incident.initial_weight,
            final_weight: incident.contribution_score,
            incident,
        }
    }
}

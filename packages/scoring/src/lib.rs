#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident and region scoring.
//!
//! All functions here are pure: they take a [`ScoringConfig`], the
//! entities involved and an explicit `now`, and never touch storage.
//!
//! - [`contribution`] scores a single incident:
//!   `initial_weight * effective_multiplier * time_decay_factor`.
//! - [`audit`] turns an auditor's environmental rating into a multiplier.
//! - [`credibility`] rates auditors from their verify/flag history.
//! - [`region`] aggregates a region's incidents into [`RegionStats`].
//!
//! [`RegionStats`]: safety_map_region_models::RegionStats

pub mod audit;
pub mod config;
pub mod contribution;
pub mod credibility;
pub mod decay;
pub mod region;

pub use audit::{EnvironmentalAssessment, RiskLevel, audit_multiplier};
pub use config::ScoringConfig;
pub use contribution::Contribution;
pub use credibility::credibility;

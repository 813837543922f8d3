#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident lifecycle orchestration.
//!
//! The [`Engine`] ties the pure scoring and matching crates to a [`Store`].
//! Every mutating operation runs read, mutate, recompute and persist to
//! completion before returning:
//!
//! 1. the incident is changed and saved,
//! 2. a [`RecomputeEvent`] is dispatched, which refreshes the incident's
//!    contribution score,
//! 3. the linked region's statistics are rebuilt from all of its incidents.
//!
//! There is no cross-request locking. Two concurrent mutations touching the
//! same region race and the last region write wins.

pub mod audits;
pub mod clock;
pub mod config;
pub mod incidents;
pub mod recompute;
pub mod regions;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use safety_map_database::{DbError, Store};
use safety_map_incident_models::Role;

pub use audits::AuditSubmission;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use recompute::{RecomputeEvent, Recomputed};

/// Errors returned by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The store failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The engine was given an invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No incident with this id.
    #[error("Incident not found: {id}")]
    IncidentNotFound {
        /// Requested id.
        id: String,
    },

    /// No region with this id.
    #[error("Region not found: {id}")]
    RegionNotFound {
        /// Requested id.
        id: String,
    },

    /// An auditor submitted an environmental score outside `[0, 1]`.
    #[error("Environmental score must be within [0, 1], got {value}")]
    InvalidEnvironmentScore {
        /// Submitted value.
        value: f64,
    },

    /// The acting user's role does not allow the operation.
    #[error("Role '{role}' may not {action}")]
    Forbidden {
        /// Role of the acting user.
        role: Role,
        /// What was attempted.
        action: &'static str,
    },

    /// A request value was rejected.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what went wrong.
        message: String,
    },
}

/// Scoring engine bound to a store, a configuration and a clock.
pub struct Engine {
    store: Arc<dyn Store>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Creates an engine using wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if `config` fails validation.
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates an engine with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if `config` fails validation.
    pub fn with_clock(
        store: Arc<dyn Store>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        Ok(Self {
            store,
            config,
            clock,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use safety_map_database::MemoryStore;

    use super::*;

    #[test]
    fn constructors_reject_invalid_config() {
        let mut config = EngineConfig::default();
        config.scoring.decay_rate = -0.01;
        config.scoring.alpha = 0.8;

        let err = Engine::new(Arc::new(MemoryStore::new()), config)
            .err()
            .unwrap();
        assert!(
            matches!(err, EngineError::Config(ConfigError::Invalid { ref problems }) if problems.len() == 2)
        );

        assert!(Engine::new(Arc::new(MemoryStore::new()), EngineConfig::default()).is_ok());
    }
}

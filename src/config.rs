//! Configuration needed to open a session against the coordination store.
//!
//! The core itself (§6 of the design doc) takes an already-built session and
//! never touches the environment; this module exists for the surrounding
//! binary that has to assemble one.

use std::env;
use std::time::Duration;

use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;

use crate::error::{ConfigError, PrepareStatementsError};

const CONTACT_POINTS_VAR: &str = "REAPER_COORD_CONTACT_POINTS";
const KEYSPACE_VAR: &str = "REAPER_COORD_KEYSPACE";
const DEFAULT_TTL_VAR: &str = "REAPER_COORD_DEFAULT_TTL_SECS";

/// Default lease/lock TTL, per §4.C and §6 of the design doc.
pub const DEFAULT_TTL_SECS: i32 = 90;

/// Connection parameters for the coordination store.
///
/// Construct explicitly with [`CoordinatorConfig::new`] in tests, or infer
/// from the environment with [`CoordinatorConfig::from_env`] in production.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub contact_points: Vec<String>,
    pub keyspace: String,
    pub default_ttl: Duration,
}

impl CoordinatorConfig {
    #[must_use]
    pub fn new(contact_points: Vec<String>, keyspace: impl Into<String>) -> Self {
        Self {
            contact_points,
            keyspace: keyspace.into(),
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS as u64),
        }
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Reads contact points, keyspace, and default TTL from the environment.
    ///
    /// `REAPER_COORD_CONTACT_POINTS` is a comma-separated host list,
    /// `REAPER_COORD_KEYSPACE` names the keyspace holding the coordination
    /// tables, and `REAPER_COORD_DEFAULT_TTL_SECS` is optional (defaults to
    /// [`DEFAULT_TTL_SECS`]).
    pub fn from_env() -> Result<Self, ConfigError> {
        let contact_points = read_var(CONTACT_POINTS_VAR)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if contact_points.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: CONTACT_POINTS_VAR,
                value: String::new(),
                reason: "must name at least one contact point",
            });
        }
        let keyspace = read_var(KEYSPACE_VAR)?;

        let default_ttl = match env::var(DEFAULT_TTL_VAR) {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    var: DEFAULT_TTL_VAR,
                    value: raw.clone(),
                    reason: "must be a non-negative integer number of seconds",
                })?;
                Duration::from_secs(secs)
            }
            Err(env::VarError::NotPresent) => Duration::from_secs(DEFAULT_TTL_SECS as u64),
            Err(env::VarError::NotUnicode(_)) => return Err(ConfigError::NotUnicode(DEFAULT_TTL_VAR)),
        };

        Ok(Self {
            contact_points,
            keyspace,
            default_ttl,
        })
    }

    /// Opens a session and switches to the configured keyspace.
    ///
    /// This is the one piece of I/O in this module; everything else is pure
    /// parsing. The returned [`Session`] is what the core's own constructor
    /// (§6) actually requires.
    pub async fn build_session(&self) -> Result<Session, PrepareStatementsError> {
        let session = SessionBuilder::new()
            .known_nodes(&self.contact_points)
            .use_keyspace(&self.keyspace, true)
            .build()
            .await?;
        Ok(session)
    }
}

fn read_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) => Ok(v),
        Err(env::VarError::NotPresent) => Err(ConfigError::MissingVar(name)),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_ttl() {
        let cfg = CoordinatorConfig::new(vec!["127.0.0.1:9042".to_string()], "reaper_db");
        assert_eq!(cfg.default_ttl, Duration::from_secs(DEFAULT_TTL_SECS as u64));
        assert_eq!(cfg.keyspace, "reaper_db");
    }

    #[test]
    fn with_default_ttl_overrides() {
        let cfg = CoordinatorConfig::new(vec!["127.0.0.1:9042".to_string()], "reaper_db")
            .with_default_ttl(Duration::from_secs(30));
        assert_eq!(cfg.default_ttl, Duration::from_secs(30));
    }
}

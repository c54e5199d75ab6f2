//! Process identity shared by the segment-lead and node-lock registries.
//!
//! Unlike the reference implementation this is passed in at construction
//! rather than read from a process-wide global, so tests can run several
//! logical instances in one process (see `DESIGN.md`).

use uuid::Uuid;

/// A stable identifier for one coordinator process.
///
/// Both fields are immutable for the lifetime of the process: the UUID is
/// assigned once at startup, and the host is the address peers should use to
/// reach this instance. Neither is re-derived per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    id: Uuid,
    host: String,
}

impl InstanceIdentity {
    /// Builds an identity from an explicit id and host.
    ///
    /// Prefer [`InstanceIdentity::generate`] in production; this constructor
    /// exists so tests can pin specific ids to assert on race outcomes.
    #[must_use]
    pub fn new(id: Uuid, host: impl Into<String>) -> Self {
        Self { id, host: host.into() }
    }

    /// Assigns a fresh random id for the given host.
    #[must_use]
    pub fn generate(host: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), host)
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

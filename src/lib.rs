//! Distributed concurrency coordination core for a multi-instance repair
//! orchestrator.
//!
//! This crate coordinates several cooperating processes ("instances") that
//! share responsibility for running repairs against a wide-column database,
//! using a Cassandra/Scylla-style coordination store as the single source of
//! truth. It offers three independent registries, each a thin wrapper over a
//! handful of prepared, conditional statements:
//!
//! - [`segment_lead`]: single-key leases with TTL (`take_lead`, `renew_lead`,
//!   `release_lead`, `get_leaders`).
//! - [`node_lock`]: atomic multi-row locks over the replica set of a repair
//!   segment, so two instances never repair nodes that share data.
//! - [`directory`]: a best-effort view of which instances are currently
//!   alive, used to size concurrency.
//!
//! None of these registries hold any lock in-process. Safety is entirely a
//! property of the coordination store's linearizable conditional writes; the
//! in-process object owns nothing but a session handle and a set of prepared
//! statements, both immutable after construction. There are no background
//! loops, no internal retries, and no caller-visible mutex — see
//! [`store`] and `DESIGN.md` for the reasoning.
//!
//! Every public async method performs exactly one network round trip (the
//! node-lock batch calls are still a single call). A lost race on a
//! conditional write is reported as `Ok(false)`, never as an `Err`; only a
//! genuine store-transport failure propagates as [`error::StoreError`].

pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod node_lock;
pub mod segment_lead;
pub mod store;

use std::sync::Arc;

pub use directory::LiveInstanceDirectory;
pub use identity::InstanceIdentity;
pub use node_lock::{NodeLockRegistry, Segment};
pub use segment_lead::SegmentLeadRegistry;
pub use store::StoreClient;

/// Marks the wire-compatible schema version this core speaks. Bumped only
/// when the statement shapes in [`store`] change in a way that is not
/// backward compatible with existing rows.
pub const STORE_VERSION: u32 = 1;

/// Single construction entry point (§6): takes a store-version marker, this
/// instance's identity, and an already-prepared store client, and returns an
/// object bearing every registry's public methods.
///
/// The core never reads environment variables, CLI flags, or files; all of
/// that belongs to the surrounding binary (see [`config`]).
pub struct Coordinator {
    pub segment_lead: SegmentLeadRegistry,
    pub node_lock: NodeLockRegistry,
    pub directory: LiveInstanceDirectory,
}

impl Coordinator {
    /// Builds the three registries over a shared store client.
    ///
    /// `store_version` is checked for forward compatibility only; this core
    /// currently understands [`STORE_VERSION`] alone.
    pub fn new(store_version: u32, identity: InstanceIdentity, store: StoreClient) -> Self {
        debug_assert_eq!(
            store_version, STORE_VERSION,
            "coordination store speaks an unrecognized wire version"
        );
        let store = Arc::new(store);
        Self {
            segment_lead: SegmentLeadRegistry::new(Arc::clone(&store), identity.clone()),
            node_lock: NodeLockRegistry::new(Arc::clone(&store), identity),
            directory: LiveInstanceDirectory::new(store),
        }
    }
}

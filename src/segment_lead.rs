//! Segment-lead lease registry (§4.C): a single-key mutex with a TTL.
//!
//! Every public method is exactly one round trip against the coordination
//! store; there are no retries, no background renewal loop, and no
//! in-process lock. Safety comes entirely from the store's linearizable LWT
//! condition, not from anything held here — mirroring the split this crate's
//! lineage draws between pure eligibility logic and the actual compare-and-set
//! I/O (see `DESIGN.md`).

use std::sync::Arc;
use std::time::Duration;

use scylla::value::CqlValue;
use uuid::Uuid;

use crate::config::DEFAULT_TTL_SECS;
use crate::error::StoreError;
use crate::identity::InstanceIdentity;
use crate::store::StoreClient;

/// Acquires, renews, probes, and releases segment-lead leases.
///
/// Cheap to clone: it only holds an `Arc<StoreClient>` and the identity of
/// this instance.
#[derive(Clone)]
pub struct SegmentLeadRegistry {
    store: Arc<StoreClient>,
    identity: InstanceIdentity,
}

impl SegmentLeadRegistry {
    #[must_use]
    pub fn new(store: Arc<StoreClient>, identity: InstanceIdentity) -> Self {
        Self { store, identity }
    }

    /// Attempts insert-if-absent of the leader row for `leader_id`, naming
    /// this instance as holder. Returns whether the LWT applied; on
    /// no-apply the row (and whoever holds it) is left untouched.
    #[tracing::instrument(skip(self), fields(leader_id = %leader_id))]
    pub async fn take_lead(&self, leader_id: Uuid) -> Result<bool, StoreError> {
        self.take_lead_with_ttl(leader_id, default_ttl()).await
    }

    /// Same as [`Self::take_lead`] with an explicit TTL.
    pub async fn take_lead_with_ttl(&self, leader_id: Uuid, ttl: Duration) -> Result<bool, StoreError> {
        let result = self
            .store
            .execute_conditional(
                &self.store.insert_leader,
                (leader_id, self.identity.id(), self.identity.host(), ttl_secs(ttl)),
            )
            .await?;
        if !result.applied {
            tracing::debug!(%leader_id, "lost the race to take lead");
        }
        Ok(result.applied)
    }

    /// Conditional update-if-holder-equals-self: rewrites the heartbeat and
    /// resets the TTL. A `false` return signals a correctness anomaly (the
    /// row expired or was stolen) and is logged loudly, but is never an
    /// `Err` — the caller decides what to do about it.
    #[tracing::instrument(skip(self), fields(leader_id = %leader_id))]
    pub async fn renew_lead(&self, leader_id: Uuid) -> Result<bool, StoreError> {
        self.renew_lead_with_ttl(leader_id, default_ttl()).await
    }

    /// Same as [`Self::renew_lead`] with an explicit TTL.
    pub async fn renew_lead_with_ttl(&self, leader_id: Uuid, ttl: Duration) -> Result<bool, StoreError> {
        let applied = self.conditional_self_write(leader_id, ttl).await?;
        if !applied {
            tracing::warn!(%leader_id, instance = %self.identity.id(), "renew_lead did not apply: lease was lost or stolen");
        }
        Ok(applied)
    }

    /// Structurally identical to [`Self::renew_lead`]: a conditional write,
    /// not a read. A read could observe a row whose TTL expires before the
    /// caller acts on the answer; the act of probing is also the act of
    /// refreshing.
    #[tracing::instrument(skip(self), fields(leader_id = %leader_id))]
    pub async fn has_lead_on_segment(&self, leader_id: Uuid) -> Result<bool, StoreError> {
        self.conditional_self_write(leader_id, default_ttl()).await
    }

    async fn conditional_self_write(&self, leader_id: Uuid, ttl: Duration) -> Result<bool, StoreError> {
        let result = self
            .store
            .execute_conditional(
                &self.store.update_leader_if_holder,
                (
                    ttl_secs(ttl),
                    self.identity.id(),
                    self.identity.host(),
                    leader_id,
                    self.identity.id(),
                ),
            )
            .await?;
        Ok(result.applied)
    }

    /// Conditional delete-if-holder-equals-self. An unsuccessful release is
    /// logged but not treated as an error: the lease will expire on its own.
    #[tracing::instrument(skip(self), fields(leader_id = %leader_id))]
    pub async fn release_lead(&self, leader_id: Uuid) -> Result<(), StoreError> {
        let result = self
            .store
            .execute_conditional(&self.store.delete_leader_if_holder, (leader_id, self.identity.id()))
            .await?;
        if !result.applied {
            tracing::debug!(%leader_id, "release_lead did not apply: lease was not held by this instance");
        }
        Ok(())
    }

    /// Non-linearizable enumeration of every present leader row, for
    /// observability and reconciliation.
    pub async fn get_leaders(&self) -> Result<Vec<Uuid>, StoreError> {
        let result = self.store.select(&self.store.select_leaders, ()).await?;
        let rows_result = result.into_rows_result()?;
        let leader_id_index = rows_result
            .column_specs()
            .get_by_name("leader_id")
            .map(|(index, _)| index);
        let Some(index) = leader_id_index else {
            return Ok(Vec::new());
        };
        let mut leaders = Vec::new();
        for row in rows_result.rows::<scylla::value::Row>()? {
            let row = row?;
            if let Some(Some(CqlValue::Uuid(id))) = row.columns.get(index) {
                leaders.push(*id);
            }
        }
        Ok(leaders)
    }
}

fn default_ttl() -> Duration {
    Duration::from_secs(DEFAULT_TTL_SECS as u64)
}

fn ttl_secs(ttl: Duration) -> i32 {
    i32::try_from(ttl.as_secs()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_secs_clamps_to_i32_max_instead_of_overflowing() {
        assert_eq!(ttl_secs(Duration::from_secs(u64::MAX)), i32::MAX);
        assert_eq!(ttl_secs(Duration::from_secs(90)), 90);
    }

    #[test]
    fn default_ttl_matches_spec_default() {
        assert_eq!(default_ttl(), Duration::from_secs(90));
    }
}

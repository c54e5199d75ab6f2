//! Node-lock registry (§4.D): serializes repairs by the data-owning nodes
//! they touch.
//!
//! A lock/renew/release call is a single conditional batch over every
//! (`repair_id`, node) row named by a [`Segment`]'s replica set. The store
//! guarantees the batch applies as one linearizable transition or not at
//! all — there is no in-process rollback path to reason about.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use scylla::value::CqlValue;
use uuid::Uuid;

use crate::config::DEFAULT_TTL_SECS;
use crate::error::StoreError;
use crate::identity::InstanceIdentity;
use crate::store::StoreClient;

/// A unit of repair work: a run, a segment within that run, and the
/// replica hosts the segment's rows live on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub repair_id: Uuid,
    pub segment_id: Uuid,
    pub replicas: Vec<String>,
}

impl Segment {
    #[must_use]
    pub fn new(repair_id: Uuid, segment_id: Uuid, replicas: Vec<String>) -> Self {
        Self {
            repair_id,
            segment_id,
            replicas,
        }
    }
}

/// Acquires, renews, probes, and releases node locks for repair segments.
#[derive(Clone)]
pub struct NodeLockRegistry {
    store: Arc<StoreClient>,
    identity: InstanceIdentity,
}

impl NodeLockRegistry {
    #[must_use]
    pub fn new(store: Arc<StoreClient>, identity: InstanceIdentity) -> Self {
        Self { store, identity }
    }

    /// Transitions every (`repair_id`, node) row for `node ∈ replicas` from
    /// unowned to owned by this instance, atomically. Applies iff every row
    /// was unowned beforehand.
    #[tracing::instrument(skip(self, replicas), fields(repair_id = %repair_id, segment_id = %segment_id, nodes = replicas.len()))]
    pub async fn lock_running_repairs_for_nodes(
        &self,
        repair_id: Uuid,
        segment_id: Uuid,
        replicas: &[String],
    ) -> Result<bool, StoreError> {
        self.batch_write(repair_id, segment_id, replicas, None, default_ttl()).await
    }

    /// Same batch as [`Self::lock_running_repairs_for_nodes`], but each
    /// row's condition is "prior holder equals self". Applies iff this
    /// instance still holds every row for this run.
    #[tracing::instrument(skip(self, replicas), fields(repair_id = %repair_id, segment_id = %segment_id, nodes = replicas.len()))]
    pub async fn renew_running_repairs_for_nodes(
        &self,
        repair_id: Uuid,
        segment_id: Uuid,
        replicas: &[String],
    ) -> Result<bool, StoreError> {
        let self_id = Some(self.identity.id());
        self.batch_write(repair_id, segment_id, replicas, self_id, default_ttl())
            .await
    }

    /// Structural synonym for [`Self::renew_running_repairs_for_nodes`]
    /// over `segment`'s replica set — probing ownership is itself a
    /// conditional write, for the same reason it is in the segment-lead
    /// registry: a read could observe a row whose TTL expires before the
    /// caller acts on the answer.
    #[tracing::instrument(skip(self, segment), fields(repair_id = %segment.repair_id, segment_id = %segment.segment_id))]
    pub async fn has_lead_on_segment(&self, segment: &Segment) -> Result<bool, StoreError> {
        self.renew_running_repairs_for_nodes(segment.repair_id, segment.segment_id, &segment.replicas)
            .await
    }

    /// Resets `reaper_instance_id`, `reaper_instance_host`, and
    /// `segment_id` to null for every row in the batch, conditional on
    /// prior holder equals self. The TTL is rewritten even here: the
    /// now-null row remains present as a sentinel so a subsequent lock
    /// attempt observes "unowned", not "absent" (§4.D TTL choice).
    #[tracing::instrument(skip(self, replicas), fields(repair_id = %repair_id, segment_id = %segment_id, nodes = replicas.len()))]
    pub async fn release_running_repairs_for_nodes(
        &self,
        repair_id: Uuid,
        segment_id: Uuid,
        replicas: &[String],
    ) -> Result<bool, StoreError> {
        let self_id = Some(self.identity.id());
        let rows: Vec<NodeLockRow> = replicas
            .iter()
            .map(|node| NodeLockRow {
                ttl: ttl_secs(default_ttl()),
                new_host: None,
                new_id: None,
                segment_id: None,
                repair_id,
                node: node.clone(),
                condition_id: self_id,
            })
            .collect();
        let applied = self.execute_batch(rows).await?;
        if !applied {
            tracing::debug!(%repair_id, %segment_id, "release_running_repairs_for_nodes did not apply: not held by this instance");
        }
        Ok(applied)
    }

    async fn batch_write(
        &self,
        repair_id: Uuid,
        segment_id: Uuid,
        replicas: &[String],
        condition_id: Option<Uuid>,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let rows: Vec<NodeLockRow> = replicas
            .iter()
            .map(|node| NodeLockRow {
                ttl: ttl_secs(ttl),
                new_host: Some(self.identity.host().to_string()),
                new_id: Some(self.identity.id()),
                segment_id: Some(segment_id),
                repair_id,
                node: node.clone(),
                condition_id,
            })
            .collect();
        let applied = self.execute_batch(rows).await?;
        if !applied {
            tracing::debug!(%repair_id, %segment_id, "node-lock batch lost a conflicting row; see diagnostic columns");
        }
        Ok(applied)
    }

    async fn execute_batch(&self, rows: Vec<NodeLockRow>) -> Result<bool, StoreError> {
        let count = rows.len();
        let values: Vec<NodeLockBindValues> = rows.into_iter().map(NodeLockRow::into_bind_values).collect();
        let result = self.store.execute_batch_conditional(count, values).await?;
        if !result.applied {
            let holder = result.column("reaper_instance_id").map_or("unknown".to_string(), |v| format!("{v:?}"));
            tracing::warn!(holder, "node-lock batch conflict");
        }
        Ok(result.applied)
    }

    /// Set of segment UUIDs currently locked anywhere for `repair_id`
    /// (rows whose `reaper_instance_id` is non-null).
    pub async fn get_locked_segments_for_run(&self, repair_id: Uuid) -> Result<HashSet<Uuid>, StoreError> {
        let rows = self.running_repair_rows(repair_id).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.segment_id.filter(|_| row.reaper_instance_id.is_some()))
            .collect())
    }

    /// Set of node names with a non-null holder for `repair_id`.
    pub async fn get_locked_nodes_for_run(&self, repair_id: Uuid) -> Result<HashSet<String>, StoreError> {
        let rows = self.running_repair_rows(repair_id).await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.reaper_instance_id.is_some())
            .map(|row| row.node)
            .collect())
    }

    async fn running_repair_rows(&self, repair_id: Uuid) -> Result<Vec<RunningRepairRow>, StoreError> {
        let result = self
            .store
            .select(&self.store.select_running_repairs_for_run, (repair_id,))
            .await?;
        let rows_result = result.into_rows_result()?;
        let specs = rows_result.column_specs();
        let node_idx = specs.get_by_name("node").map(|(i, _)| i);
        let segment_idx = specs.get_by_name("segment_id").map(|(i, _)| i);
        let holder_idx = specs.get_by_name("reaper_instance_id").map(|(i, _)| i);

        let mut rows = Vec::new();
        for row in rows_result.rows::<scylla::value::Row>()? {
            let row = row?;
            let node = node_idx
                .and_then(|i| row.columns.get(i))
                .and_then(|v| v.as_ref())
                .and_then(|v| match v {
                    CqlValue::Text(s) => Some(s.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            let segment_id = segment_idx
                .and_then(|i| row.columns.get(i))
                .and_then(|v| v.as_ref())
                .and_then(|v| match v {
                    CqlValue::Uuid(id) => Some(*id),
                    _ => None,
                });
            let reaper_instance_id = holder_idx
                .and_then(|i| row.columns.get(i))
                .and_then(|v| v.as_ref())
                .and_then(|v| match v {
                    CqlValue::Uuid(id) => Some(*id),
                    _ => None,
                });
            rows.push(RunningRepairRow {
                node,
                segment_id,
                reaper_instance_id,
            });
        }
        Ok(rows)
    }
}

struct RunningRepairRow {
    node: String,
    segment_id: Option<Uuid>,
    reaper_instance_id: Option<Uuid>,
}

struct NodeLockRow {
    ttl: i32,
    new_host: Option<String>,
    new_id: Option<Uuid>,
    segment_id: Option<Uuid>,
    repair_id: Uuid,
    node: String,
    condition_id: Option<Uuid>,
}

type NodeLockBindValues = (i32, Option<String>, Option<Uuid>, Option<Uuid>, Uuid, String, Option<Uuid>);

impl NodeLockRow {
    fn into_bind_values(self) -> NodeLockBindValues {
        (
            self.ttl,
            self.new_host,
            self.new_id,
            self.segment_id,
            self.repair_id,
            self.node,
            self.condition_id,
        )
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
    fn segment_new_preserves_fields() {
        let repair_id = Uuid::new_v4();
        let segment_id = Uuid::new_v4();
        let segment = Segment::new(repair_id, segment_id, vec!["n1".to_string(), "n2".to_string()]);
        assert_eq!(segment.repair_id, repair_id);
        assert_eq!(segment.segment_id, segment_id);
        assert_eq!(segment.replicas, vec!["n1".to_string(), "n2".to_string()]);
    }
}

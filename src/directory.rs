//! Live-instance directory (§4.E): a best-effort view of which coordinator
//! instances are currently registered.
//!
//! This registry is read-only from the core's perspective — `running_reapers`
//! rows are written by each instance's own heartbeat process, outside this
//! crate's scope.

use std::sync::Arc;

use scylla::value::CqlValue;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::StoreClient;

/// Enumerates live coordinator instances.
#[derive(Clone)]
pub struct LiveInstanceDirectory {
    store: Arc<StoreClient>,
}

impl LiveInstanceDirectory {
    #[must_use]
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Enumerates every registered instance. No consistency guarantee
    /// beyond the store's default: this is eventually consistent with
    /// peer heartbeats.
    pub async fn get_running_reapers(&self) -> Result<Vec<Uuid>, StoreError> {
        let result = self.store.select(&self.store.select_running_reapers, ()).await?;
        let rows_result = result.into_rows_result()?;
        let Some((index, _)) = rows_result.column_specs().get_by_name("reaper_instance_id") else {
            return Ok(Vec::new());
        };
        let mut instances = Vec::new();
        for row in rows_result.rows::<scylla::value::Row>()? {
            let row = row?;
            if let Some(Some(CqlValue::Uuid(id))) = row.columns.get(index) {
                instances.push(*id);
            }
        }
        Ok(instances)
    }

    /// Number of registered instances, clamped to at least 1 so an isolated
    /// instance never divides concurrency by zero.
    pub async fn count_running_reapers(&self) -> Result<usize, StoreError> {
        let reapers = self.get_running_reapers().await?;
        Ok(reapers.len().max(1))
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn clamp_is_pure_and_testable_without_a_store() {
        assert_eq!(clamp(0), 1);
        assert_eq!(clamp(1), 1);
        assert_eq!(clamp(5), 5);
    }

    fn clamp(count: usize) -> usize {
        count.max(1)
    }
}

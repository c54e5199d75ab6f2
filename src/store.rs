//! Thin adapter over the coordination store session (§4.A).
//!
//! [`StoreClient`] prepares every statement this crate needs exactly once,
//! at construction, and exposes three capabilities: execute a bound
//! statement, execute a bound conditional (LWT) statement, and execute a
//! conditional batch. It never retries a conditional write: a retry after a
//! successful apply would misreport success as failure and break the
//! per-row mutex invariants the registries depend on.

mod statements;

use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::frame::types::{Consistency, SerialConsistency};
use scylla::response::query_result::QueryResult;
use scylla::serialize::batch::BatchValues;
use scylla::serialize::row::SerializeRow;
use scylla::statement::batch::{Batch, BatchType};
use scylla::statement::prepared::PreparedStatement;
use scylla::value::{CqlValue, Row};

use crate::error::{PrepareStatementsError, StoreError};

/// Prepared statements bound to a single coordination-store session.
///
/// Constructed once and shared (via `&StoreClient`) by every registry; the
/// set of prepared statements is immutable after construction, the only
/// caller-visible shared state besides the session itself (§5).
pub struct StoreClient {
    session: Session,
    pub(crate) insert_leader: PreparedStatement,
    pub(crate) update_leader_if_holder: PreparedStatement,
    pub(crate) delete_leader_if_holder: PreparedStatement,
    pub(crate) update_running_repair_if_holder: PreparedStatement,
    pub(crate) select_running_repairs_for_run: PreparedStatement,
    pub(crate) select_leaders: PreparedStatement,
    pub(crate) select_running_reapers: PreparedStatement,
}

impl StoreClient {
    /// Prepares all statements against `session`. The returned client is
    /// unusable until every statement has been prepared successfully.
    pub async fn new(session: Session) -> Result<Self, PrepareStatementsError> {
        let mut insert_leader = session.prepare(statements::INSERT_LEADER).await?;
        insert_leader.set_consistency(Consistency::Quorum);
        insert_leader.set_serial_consistency(Some(SerialConsistency::Serial));

        let mut update_leader_if_holder = session.prepare(statements::UPDATE_LEADER_IF_HOLDER).await?;
        update_leader_if_holder.set_consistency(Consistency::Quorum);
        update_leader_if_holder.set_serial_consistency(Some(SerialConsistency::Serial));

        let mut delete_leader_if_holder = session.prepare(statements::DELETE_LEADER_IF_HOLDER).await?;
        delete_leader_if_holder.set_consistency(Consistency::Quorum);
        delete_leader_if_holder.set_serial_consistency(Some(SerialConsistency::Serial));

        // Consistency/idempotency set here only cover this statement when it
        // runs standalone; it is actually only ever executed cloned into a
        // `Batch` (see `execute_batch_conditional`), which carries its own
        // independent config and falls back to the execution profile's
        // defaults if unset. These calls are harmless documentation of the
        // intended per-statement levels, not what governs the batch path.
        let mut update_running_repair_if_holder =
            session.prepare(statements::UPDATE_RUNNING_REPAIR_IF_HOLDER).await?;
        update_running_repair_if_holder.set_consistency(Consistency::Quorum);
        update_running_repair_if_holder.set_serial_consistency(Some(SerialConsistency::Serial));
        update_running_repair_if_holder.set_is_idempotent(false);

        let mut select_running_repairs_for_run = session.prepare(statements::SELECT_RUNNING_REPAIRS_FOR_RUN).await?;
        select_running_repairs_for_run.set_consistency(Consistency::Quorum);
        let select_leaders = session.prepare(statements::SELECT_LEADERS).await?;
        let select_running_reapers = session.prepare(statements::SELECT_RUNNING_REAPERS).await?;

        Ok(Self {
            session,
            insert_leader,
            update_leader_if_holder,
            delete_leader_if_holder,
            update_running_repair_if_holder,
            select_running_repairs_for_run,
            select_leaders,
            select_running_reapers,
        })
    }

    /// Builds a session from `contact_points`/`keyspace` and prepares every
    /// statement against it. Convenience wrapper around
    /// [`SessionBuilder`] + [`StoreClient::new`] for callers that don't need
    /// to customize session construction.
    pub async fn connect(
        contact_points: &[String],
        keyspace: &str,
    ) -> Result<Self, PrepareStatementsError> {
        let session = SessionBuilder::new()
            .known_nodes(contact_points)
            .use_keyspace(keyspace, true)
            .build()
            .await?;
        Self::new(session).await
    }

    /// Executes a bound, unconditional statement and returns its raw rows.
    pub(crate) async fn select(
        &self,
        stmt: &PreparedStatement,
        values: impl SerializeRow,
    ) -> Result<QueryResult, StoreError> {
        Ok(self.session.execute_unpaged(stmt, values).await?)
    }

    /// Executes a bound conditional (LWT) statement and reports whether it
    /// applied, along with the row the store sent back (the current values
    /// on conflict, or just `[applied]` on success).
    pub(crate) async fn execute_conditional(
        &self,
        stmt: &PreparedStatement,
        values: impl SerializeRow,
    ) -> Result<AppliedResult, StoreError> {
        let result = self.session.execute_unpaged(stmt, values).await?;
        AppliedResult::from_query_result(result)
    }

    /// Executes a conditional batch; applies iff every statement's
    /// condition holds (§4.D). The store guarantees no partial application.
    ///
    /// A `Batch` carries its own `StatementConfig`, independent of the
    /// per-statement config on the `PreparedStatement`s appended to it —
    /// `Session::batch` reads only the batch's own consistency/serial
    /// consistency/idempotency, falling back to the execution profile's
    /// defaults (`LocalQuorum`/`LocalSerial`) when unset. The batch is
    /// configured explicitly here so it runs at the QUORUM/SERIAL levels
    /// spec §6 statement 4 requires, not the profile defaults.
    pub(crate) async fn execute_batch_conditional(
        &self,
        statement_count: usize,
        values: impl BatchValues,
    ) -> Result<AppliedResult, StoreError> {
        let mut batch = Batch::new(BatchType::Unlogged);
        for _ in 0..statement_count {
            batch.append_statement(self.update_running_repair_if_holder.clone());
        }
        batch.set_consistency(Consistency::Quorum);
        batch.set_serial_consistency(Some(SerialConsistency::Serial));
        batch.set_is_idempotent(false);
        let result = self.session.batch(&batch, values).await?;
        AppliedResult::from_query_result(result)
    }
}

/// The outcome of a conditional write, plus whatever columns the store sent
/// back (either just `[applied]` on success, or the conflicting row's
/// current values otherwise).
pub(crate) struct AppliedResult {
    pub(crate) applied: bool,
    columns: Vec<(String, Option<CqlValue>)>,
}

impl AppliedResult {
    fn from_query_result(result: QueryResult) -> Result<Self, StoreError> {
        let rows_result = result.into_rows_result()?;
        let names: Vec<String> = rows_result
            .column_specs()
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();
        let row: Row = rows_result.rows::<Row>()?.next().transpose()?.unwrap_or_default();
        let applied = matches!(row.columns.first(), Some(Some(CqlValue::Boolean(true))));
        let columns = names.into_iter().zip(row.columns).collect();
        Ok(Self { applied, columns })
    }

    /// Looks up a diagnostic column by name. Missing or null columns yield
    /// `None`; callers log `"unknown"` in that case rather than propagate
    /// an error (§7, malformed conflict row).
    pub(crate) fn column(&self, name: &str) -> Option<&CqlValue> {
        self.columns
            .iter()
            .find(|(col_name, _)| col_name == name)
            .and_then(|(_, value)| value.as_ref())
    }
}

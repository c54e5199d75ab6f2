//! CQL text for the seven prepared statements this crate issues.
//!
//! Keeping the exact statement shapes in one place makes the wire contract
//! with the coordination store auditable independent of how each registry
//! binds values to it.

pub(super) const INSERT_LEADER: &str = "\
    INSERT INTO leader (leader_id, reaper_instance_id, reaper_instance_host, last_heartbeat) \
    VALUES (?, ?, ?, now()) IF NOT EXISTS USING TTL ?";

pub(super) const UPDATE_LEADER_IF_HOLDER: &str = "\
    UPDATE leader USING TTL ? \
    SET reaper_instance_id = ?, reaper_instance_host = ?, last_heartbeat = now() \
    WHERE leader_id = ? IF reaper_instance_id = ?";

pub(super) const DELETE_LEADER_IF_HOLDER: &str = "\
    DELETE FROM leader WHERE leader_id = ? IF reaper_instance_id = ?";

pub(super) const UPDATE_RUNNING_REPAIR_IF_HOLDER: &str = "\
    UPDATE running_repairs USING TTL ? \
    SET reaper_instance_host = ?, reaper_instance_id = ?, segment_id = ? \
    WHERE repair_id = ? AND node = ? IF reaper_instance_id = ?";

pub(super) const SELECT_RUNNING_REPAIRS_FOR_RUN: &str = "\
    SELECT repair_id, node, reaper_instance_host, reaper_instance_id, segment_id \
    FROM running_repairs WHERE repair_id = ?";

pub(super) const SELECT_LEADERS: &str = "SELECT * FROM leader";

pub(super) const SELECT_RUNNING_REAPERS: &str = "SELECT reaper_instance_id FROM running_reapers";

//! Observer interface for store notifications.
//!
//! Fire-and-forget: the store never consumes a return value and always
//! dispatches outside its state lock, so an observer may call back into
//! the store without deadlocking. The state it then reads may already
//! have moved past the mutation that triggered the notification —
//! `on_graph_changed` is the authoritative "stable now" signal, fired
//! once per completed mutation + recompute cycle.

use crate::model::{Node, PersonId};

/// Subscriber to store mutations. All methods default to no-ops; implement
/// only the ones of interest.
#[allow(unused_variables)]
pub trait TreeObserver: Send + Sync {
    /// A node was inserted via `add_person`.
    fn on_node_added(&self, node: &Node) {}

    /// A child moved between parents (or to/from the root list).
    fn on_parent_changed(
        &self,
        child: PersonId,
        old_parent: Option<PersonId>,
        new_parent: Option<PersonId>,
    ) {
    }

    /// A partner link was attached or detached.
    fn on_partner_changed(
        &self,
        person: PersonId,
        old_partner: Option<PersonId>,
        new_partner: Option<PersonId>,
    ) {
    }

    /// A single person's fields were edited in place via `update_person`.
    fn on_person_updated(&self, person: PersonId) {}

    /// Edges, distance tables and summary statistics are rebuilt and stable.
    fn on_graph_changed(&self) {}
}

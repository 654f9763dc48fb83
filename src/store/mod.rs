//! # Graph Store / Tree Manager
//!
//! `TreeStore` owns the canonical node arena and root list, exposes the
//! mutation protocol, and orchestrates recomputation of the derived
//! distance graph.
//!
//! ## Locking discipline
//!
//! One `RwLock` guards the arena and root list. Every mutation takes the
//! write lock for the structural edit only; notifications and the full
//! recompute run **after** the lock is released, so an observer reacting
//! to a notification may call straight back into the store. Every list the
//! store hands out is a snapshot clone taken under the lock, never a live
//! view — stale snapshots are refreshed by re-reading on the next
//! `on_graph_changed`.
//!
//! ## Failure atomicity
//!
//! Validation happens before any structural write, so a failed mutation
//! leaves the store exactly as it was.

pub mod recompute;

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use tracing::debug;

use crate::geo::{DistanceModel, SphericalMercator};
use crate::model::{Node, Person, PersonId, TransferRecord};
use crate::observer::TreeObserver;
use crate::{Error, Result};

pub use recompute::DistanceSummary;

// ============================================================================
// TreeStore
// ============================================================================

/// Thread-safe genealogical graph store.
///
/// Cheap to clone — clones share the same underlying state.
pub struct TreeStore {
    inner: Arc<StoreInner>,
}

impl Clone for TreeStore {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

pub(crate) struct StoreInner {
    pub(crate) state: RwLock<TreeState>,
    pub(crate) observers: RwLock<Vec<Arc<dyn TreeObserver>>>,
    pub(crate) summary: RwLock<DistanceSummary>,
    pub(crate) distance: Box<dyn DistanceModel>,
}

/// The lock-guarded canonical state: the node arena plus the root list.
#[derive(Default)]
pub(crate) struct TreeState {
    pub(crate) nodes: HashMap<PersonId, Node>,
    pub(crate) roots: Vec<PersonId>,
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore {
    /// Empty store using the default WebMercator distance model.
    pub fn new() -> Self {
        Self::with_distance_model(Box::new(SphericalMercator))
    }

    /// Empty store with a caller-supplied distance model.
    pub fn with_distance_model(distance: Box<dyn DistanceModel>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(TreeState::default()),
                observers: RwLock::new(Vec::new()),
                summary: RwLock::new(DistanceSummary::default()),
                distance,
            }),
        }
    }

    /// Register an observer for mutation and recompute notifications.
    pub fn subscribe(&self, observer: Arc<dyn TreeObserver>) {
        self.inner.observers.write().push(observer);
    }

    pub(crate) fn notify(&self, f: impl Fn(&dyn TreeObserver)) {
        let observers = self.inner.observers.read().clone();
        // Dispatch strictly outside the observer and state locks.
        for obs in observers {
            f(obs.as_ref());
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Lookup by identity. Returns a snapshot clone; no side effects.
    pub fn find(&self, id: PersonId) -> Option<Node> {
        self.inner.state.read().nodes.get(&id).cloned()
    }

    /// Snapshot of the current root nodes.
    pub fn roots(&self) -> Vec<Node> {
        let state = self.inner.state.read();
        state
            .roots
            .iter()
            .filter_map(|id| state.nodes.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().nodes.is_empty()
    }

    /// Number of parent links between `id` and its root, or None if absent.
    pub fn depth_of(&self, id: PersonId) -> Option<usize> {
        let state = self.inner.state.read();
        state.nodes.get(&id)?;
        let mut depth = 0;
        let mut cur = state.nodes.get(&id).and_then(|n| n.parent);
        while let Some(pid) = cur {
            depth += 1;
            cur = state.nodes.get(&pid).and_then(|n| n.parent);
        }
        Some(depth)
    }

    /// The partner node of `id`, if the partner reference resolves.
    pub fn partner_of(&self, id: PersonId) -> Option<Node> {
        let state = self.inner.state.read();
        let pid = state.nodes.get(&id)?.person.partner_id?;
        state.nodes.get(&pid).cloned()
    }

    /// Every node that may legally become the parent of `id`: the full node
    /// set minus the subtree rooted at `id` (a node cannot become its own
    /// descendant's child). Empty when `id` is absent.
    pub fn allowed_parents(&self, id: PersonId) -> Vec<Node> {
        let state = self.inner.state.read();
        if !state.nodes.contains_key(&id) {
            return Vec::new();
        }
        let banned = state.subtree_ids(id);
        state
            .nodes
            .values()
            .filter(|n| !banned.contains(&n.id()))
            .cloned()
            .collect()
    }

    // ========================================================================
    // Mutation protocol
    // ========================================================================

    /// Insert a new person, optionally under a parent.
    ///
    /// An absent or unresolvable `parent_id` makes the node a root. Fails
    /// with `DuplicateIdentity` if the identity already exists, and with
    /// `CycleDetected` if the prospective parent were a descendant of the
    /// new node (impossible for a fresh leaf, but checked uniformly).
    pub fn add_person(&self, mut person: Person, parent_id: Option<PersonId>) -> Result<Node> {
        let created = {
            let mut state = self.inner.state.write();
            let id = person.id();
            if state.nodes.contains_key(&id) {
                return Err(Error::DuplicateIdentity(id));
            }
            let attach = match parent_id {
                Some(pid) if state.nodes.contains_key(&pid) => {
                    if state.is_ancestor(id, pid) {
                        return Err(Error::CycleDetected);
                    }
                    Some(pid)
                }
                // Unresolvable parent falls back to root, same as None.
                _ => None,
            };
            if let Some(pid) = attach {
                person.parent_id = Some(pid);
            }
            let mut node = Node::new(person);
            node.parent = attach;
            let snapshot = node.clone();
            state.nodes.insert(id, node);
            match attach {
                Some(pid) => {
                    if let Some(parent) = state.nodes.get_mut(&pid) {
                        parent.children.push(id);
                    }
                }
                None => state.roots.push(id),
            }
            snapshot
        };
        debug!(id = %created.id(), "person added");
        self.notify(|o| o.on_node_added(&created));
        self.recompute_all();
        Ok(created)
    }

    /// Move `child_id` under a new parent, or to the root list with `None`.
    pub fn reassign_parent(
        &self,
        child_id: PersonId,
        new_parent_id: Option<PersonId>,
    ) -> Result<()> {
        let old_parent = {
            let mut state = self.inner.state.write();
            if !state.nodes.contains_key(&child_id) {
                return Err(Error::NotFound(format!("child {child_id}")));
            }
            if let Some(pid) = new_parent_id {
                if pid == child_id {
                    return Err(Error::SelfParent);
                }
                if !state.nodes.contains_key(&pid) {
                    return Err(Error::NotFound(format!("new parent {pid}")));
                }
                // Walk up from the prospective parent: meeting the child
                // means reparenting would create a cycle.
                if state.is_ancestor(child_id, pid) {
                    return Err(Error::CycleDetected);
                }
            }
            let old_parent = state.nodes.get(&child_id).and_then(|n| n.parent);
            state.detach_from_parent(child_id);
            match new_parent_id {
                None => {
                    if !state.roots.contains(&child_id) {
                        state.roots.push(child_id);
                    }
                    if let Some(child) = state.nodes.get_mut(&child_id) {
                        child.person.parent_id = None;
                    }
                }
                Some(pid) => {
                    state.roots.retain(|r| *r != child_id);
                    state.attach_child(pid, child_id);
                }
            }
            old_parent
        };
        debug!(child = %child_id, ?old_parent, ?new_parent_id, "parent reassigned");
        self.notify(|o| o.on_parent_changed(child_id, old_parent, new_parent_id));
        self.recompute_all();
        Ok(())
    }

    /// Attach a symmetric partner link, or detach with `id_b = None`.
    ///
    /// Any existing partner on either side is detached first. Re-attaching
    /// an already-mutual pair and detaching an unpartnered person are
    /// no-ops that fire no notification and trigger no recompute.
    pub fn set_partner(&self, id_a: PersonId, id_b: Option<PersonId>) -> Result<()> {
        let (old_partner, new_partner) = {
            let mut state = self.inner.state.write();
            let Some(node_a) = state.nodes.get(&id_a) else {
                return Err(Error::NotFound(format!("person {id_a}")));
            };
            let old = node_a.person.partner_id;
            match id_b {
                None => {
                    if old.is_none() {
                        return Ok(());
                    }
                    state.detach_partner(id_a);
                    (old, None)
                }
                Some(b) => {
                    if b == id_a {
                        return Err(Error::SelfPartner);
                    }
                    if !state.nodes.contains_key(&b) {
                        return Err(Error::NotFound(format!("person {b}")));
                    }
                    let partner_of_b = state.nodes.get(&b).and_then(|n| n.person.partner_id);
                    if old == Some(b) && partner_of_b == Some(id_a) {
                        return Ok(());
                    }
                    state.detach_partner(id_a);
                    state.detach_partner(b);
                    if let Some(a) = state.nodes.get_mut(&id_a) {
                        a.person.partner_id = Some(b);
                    }
                    if let Some(bn) = state.nodes.get_mut(&b) {
                        bn.person.partner_id = Some(id_a);
                    }
                    (old, Some(b))
                }
            }
        };
        debug!(person = %id_a, ?old_partner, ?new_partner, "partner changed");
        self.notify(|o| o.on_partner_changed(id_a, old_partner, new_partner));
        self.recompute_all();
        Ok(())
    }

    /// Edit a person's fields in place.
    ///
    /// Intended for demographic and geographic fields; structural changes
    /// go through `reassign_parent` / `set_partner`. A `parent_id` or
    /// `partner_id` written here is treated as a plain (possibly dangling)
    /// reference, not a structural edit.
    pub fn update_person(&self, id: PersonId, edit: impl FnOnce(&mut Person)) -> Result<()> {
        {
            let mut state = self.inner.state.write();
            let node = state
                .nodes
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("person {id}")))?;
            edit(&mut node.person);
        }
        self.notify(|o| o.on_person_updated(id));
        self.recompute_all();
        Ok(())
    }

    // ========================================================================
    // Bulk build
    // ========================================================================

    /// Replace the entire store from a flat person list, linking each person
    /// to the parent named by its own `parent_id`.
    pub fn build_from(&self, persons: Vec<Person>) {
        self.build_from_with(persons, |p: &Person| p.parent_id);
    }

    /// Replace the entire store, choosing each person's parent through
    /// `parent_selector`. Unlinkable or parentless persons become roots.
    /// The swap into the live store is atomic.
    pub fn build_from_with<F>(&self, persons: Vec<Person>, parent_selector: F)
    where
        F: Fn(&Person) -> Option<PersonId>,
    {
        let fresh = TreeState::link(persons, &parent_selector);
        *self.inner.state.write() = fresh;
        debug!(count = self.len(), "store rebuilt from person list");
        self.recompute_all();
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    /// Snapshot every person as a flat transfer record.
    pub fn export(&self) -> Vec<TransferRecord> {
        let state = self.inner.state.read();
        state
            .nodes
            .values()
            .map(|n| TransferRecord::from(&n.person))
            .collect()
    }

    /// Three-phase rebuild from transfer records: construct one node per
    /// record, link parents (an unresolvable parent reference silently
    /// becomes a root), then link partners symmetrically (an absent partner
    /// stays as an unresolved reference). The result replaces the live
    /// store atomically, followed by a full recompute.
    pub fn import(&self, records: Vec<TransferRecord>) {
        let persons: Vec<Person> = records
            .into_iter()
            .map(TransferRecord::into_person)
            .collect();
        let mut fresh = TreeState::link(persons, &|p: &Person| p.parent_id);
        fresh.link_partners();
        *self.inner.state.write() = fresh;
        debug!(count = self.len(), "store imported from transfer records");
        self.recompute_all();
    }

    // ========================================================================
    // Derived results
    // ========================================================================

    /// Snapshot of the min/max/average aggregates from the last recompute.
    pub fn distance_summary(&self) -> DistanceSummary {
        self.inner.summary.read().clone()
    }

    /// Snapshot of `id`'s all-pairs distance table from the last recompute.
    pub fn distances_from(&self, id: PersonId) -> Option<HashMap<PersonId, f64>> {
        self.inner
            .state
            .read()
            .nodes
            .get(&id)
            .map(|n| n.distances.clone())
    }
}

// ============================================================================
// TreeState internals
// ============================================================================

impl TreeState {
    /// True when walking up the parent chain from `from` reaches `target`
    /// (including `from == target`). Terminates because the forest is
    /// acyclic by invariant.
    fn is_ancestor(&self, target: PersonId, from: PersonId) -> bool {
        let mut cur = Some(from);
        while let Some(id) = cur {
            if id == target {
                return true;
            }
            cur = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Identity set of the subtree rooted at `id`, by depth-first traversal.
    fn subtree_ids(&self, id: PersonId) -> HashSet<PersonId> {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            if let Some(node) = self.nodes.get(&cur) {
                stack.extend(node.children.iter().copied());
            }
        }
        seen
    }

    fn attach_child(&mut self, parent: PersonId, child: PersonId) {
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            if !parent_node.children.contains(&child) {
                parent_node.children.push(child);
            }
        }
        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parent = Some(parent);
            child_node.person.parent_id = Some(parent);
        }
    }

    fn detach_from_parent(&mut self, child: PersonId) {
        let Some(parent) = self.nodes.get(&child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|c| *c != child);
        }
        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parent = None;
            child_node.person.parent_id = None;
        }
    }

    /// Clear `id`'s partner reference, and the other side too when the pair
    /// is mutual. A dangling partner reference is simply dropped.
    fn detach_partner(&mut self, id: PersonId) {
        let Some(partner) = self.nodes.get(&id).and_then(|n| n.person.partner_id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&id) {
            node.person.partner_id = None;
        }
        if let Some(other) = self.nodes.get_mut(&partner) {
            if other.person.partner_id == Some(id) {
                other.person.partner_id = None;
            }
        }
    }

    /// Build a fresh forest: one node per person, then one linking pass.
    /// A parent reference that does not resolve within the batch (or names
    /// the person itself) degrades to a root.
    fn link(persons: Vec<Person>, selector: &dyn Fn(&Person) -> Option<PersonId>) -> Self {
        let mut state = TreeState::default();
        let chosen: Vec<(PersonId, Option<PersonId>)> = persons
            .iter()
            .map(|p| (p.id(), selector(p)))
            .collect();
        for person in persons {
            state.nodes.insert(person.id(), Node::new(person));
        }
        for (id, parent) in chosen {
            match parent {
                Some(pid) if pid != id && state.nodes.contains_key(&pid) => {
                    state.attach_child(pid, id);
                }
                _ => state.roots.push(id),
            }
        }
        state
    }

    /// Materialize partner references symmetrically. Pairs already mutual
    /// are left alone; a partner identity absent from the arena stays as an
    /// unresolved reference on the one side that carries it.
    fn link_partners(&mut self) {
        let ids: Vec<PersonId> = self.nodes.keys().copied().collect();
        let mut paired: HashSet<PersonId> = HashSet::new();
        for id in ids {
            if paired.contains(&id) {
                continue;
            }
            let Some(pid) = self.nodes.get(&id).and_then(|n| n.person.partner_id) else {
                continue;
            };
            if !self.nodes.contains_key(&pid) {
                continue;
            }
            if let Some(other) = self.nodes.get_mut(&pid) {
                other.person.partner_id = Some(id);
            }
            paired.insert(id);
            paired.insert(pid);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

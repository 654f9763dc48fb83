//! Edge materialization, shortest paths and summary statistics.
//!
//! The full pipeline runs after every structural mutation:
//! `materialize_edges` → one Dijkstra pass per node → `compute_extremes`,
//! then a single `on_graph_changed` notification. Scratch state is always
//! rebuilt from scratch, never patched.
//!
//! Each phase snapshots the node set under a brief lock window and does
//! its work outside the lock. A structural mutation racing a recompute is
//! tolerated: the recompute may operate on a slightly stale snapshot,
//! which the mutation's own recompute then corrects.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use tracing::trace;

use crate::model::{Edge, Person, PersonId};

use super::TreeStore;

/// Aggregates over the derived distance graph, refreshed per recompute.
///
/// `average_km` is the mean weight over distinct qualifying unordered
/// pairs (0 when none exist). The extreme pairs are `(source, target)`
/// persons of the largest and smallest finite, non-zero shortest
/// distances; ties keep the first pair encountered in iteration order.
#[derive(Debug, Clone, Default)]
pub struct DistanceSummary {
    pub average_km: f64,
    pub min_pair: Option<(Person, Person)>,
    pub max_pair: Option<(Person, Person)>,
}

/// Per-node structural snapshot used by edge materialization.
struct NodeSnap {
    children: Vec<PersonId>,
    exclude: bool,
    partner: Option<PersonId>,
    lon: Option<f64>,
    lat: Option<f64>,
}

impl TreeStore {
    /// Full pipeline: edges → all-pairs distances → extremes → notify.
    pub(crate) fn recompute_all(&self) {
        self.materialize_edges();
        self.compute_all_distances();
        self.compute_extremes();
        self.notify(|o| o.on_graph_changed());
    }

    /// Rebuild every node's edge list from the tree structure.
    ///
    /// For each parent/child pair found by depth-first traversal from the
    /// roots: skip it when either person is excluded from distance, when
    /// the pair is actually a partner pair (a partner link is not a tree
    /// edge), or when the distance comes out non-finite (missing
    /// coordinates). Otherwise insert both directed arcs with the same
    /// weight. The average is taken over distinct unordered pairs.
    fn materialize_edges(&self) {
        let (roots, snap) = {
            let state = self.inner.state.read();
            let snap: HashMap<PersonId, NodeSnap> = state
                .nodes
                .iter()
                .map(|(id, n)| {
                    (
                        *id,
                        NodeSnap {
                            children: n.children.to_vec(),
                            exclude: n.person.exclude_from_distance,
                            partner: n.person.partner_id,
                            lon: n.person.lon,
                            lat: n.person.lat,
                        },
                    )
                })
                .collect();
            (state.roots.clone(), snap)
        };

        let mut edges: HashMap<PersonId, Vec<Edge>> = HashMap::new();
        let mut pair_weights: HashMap<(PersonId, PersonId), f64> = HashMap::new();

        for root in &roots {
            let mut stack = vec![*root];
            while let Some(cur) = stack.pop() {
                let Some(parent) = snap.get(&cur) else {
                    continue;
                };
                for child_id in &parent.children {
                    let Some(child) = snap.get(child_id) else {
                        continue;
                    };
                    stack.push(*child_id);
                    if parent.exclude || child.exclude {
                        continue;
                    }
                    if parent.partner == Some(*child_id) {
                        continue;
                    }
                    let w = self
                        .inner
                        .distance
                        .distance_km(parent.lon, parent.lat, child.lon, child.lat);
                    if !w.is_finite() {
                        continue;
                    }
                    edges.entry(cur).or_default().push(Edge::new(cur, *child_id, w));
                    edges
                        .entry(*child_id)
                        .or_default()
                        .push(Edge::new(*child_id, cur, w));
                    let key = if cur <= *child_id {
                        (cur, *child_id)
                    } else {
                        (*child_id, cur)
                    };
                    pair_weights.entry(key).or_insert(w);
                }
            }
        }

        let pair_count = pair_weights.len();
        let average = if pair_count == 0 {
            0.0
        } else {
            pair_weights.values().sum::<f64>() / pair_count as f64
        };

        {
            let mut state = self.inner.state.write();
            for node in state.nodes.values_mut() {
                node.edges = edges.remove(&node.id()).unwrap_or_default();
            }
        }
        self.inner.summary.write().average_km = average;
        trace!(pairs = pair_count, average_km = average, "edges materialized");
    }

    /// Single-source shortest paths over the current edge lists.
    ///
    /// Every node appears in the result; unreachable nodes (and every node
    /// when `source` is absent) map to +∞.
    pub fn shortest_paths_from(&self, source: PersonId) -> HashMap<PersonId, f64> {
        let (ids, adjacency) = self.adjacency_snapshot();
        dijkstra(&ids, &adjacency, source)
    }

    fn adjacency_snapshot(
        &self,
    ) -> (Vec<PersonId>, HashMap<PersonId, Vec<(PersonId, f64)>>) {
        let state = self.inner.state.read();
        let ids: Vec<PersonId> = state.nodes.keys().copied().collect();
        let adjacency = state
            .nodes
            .iter()
            .map(|(id, n)| {
                (*id, n.edges.iter().map(|e| (e.dst, e.weight)).collect())
            })
            .collect();
        (ids, adjacency)
    }

    /// One Dijkstra pass per node, stored as each node's distance table.
    fn compute_all_distances(&self) {
        let (ids, adjacency) = self.adjacency_snapshot();
        let mut tables: HashMap<PersonId, HashMap<PersonId, f64>> = ids
            .iter()
            .map(|id| (*id, dijkstra(&ids, &adjacency, *id)))
            .collect();
        let mut state = self.inner.state.write();
        for node in state.nodes.values_mut() {
            if let Some(table) = tables.remove(&node.id()) {
                node.distances = table;
            }
        }
    }

    /// Scan every distance table for the extreme finite, non-self,
    /// non-zero pairs. First-encountered wins on ties; iteration order over
    /// the arena is unspecified, so callers must not rely on tie-break
    /// determinism.
    fn compute_extremes(&self) {
        let mut max: Option<f64> = None;
        let mut min: Option<f64> = None;
        let mut max_pair: Option<(Person, Person)> = None;
        let mut min_pair: Option<(Person, Person)> = None;
        {
            let state = self.inner.state.read();
            for src in state.nodes.values() {
                for (target_id, d) in &src.distances {
                    if !d.is_finite() || *d == 0.0 || *target_id == src.id() {
                        continue;
                    }
                    if max.is_none_or(|m| *d > m) {
                        max = Some(*d);
                        max_pair = state
                            .nodes
                            .get(target_id)
                            .map(|t| (src.person.clone(), t.person.clone()));
                    }
                    if min.is_none_or(|m| *d < m) {
                        min = Some(*d);
                        min_pair = state
                            .nodes
                            .get(target_id)
                            .map(|t| (src.person.clone(), t.person.clone()));
                    }
                }
            }
        }
        let mut summary = self.inner.summary.write();
        summary.max_pair = max_pair;
        summary.min_pair = min_pair;
    }
}

// ============================================================================
// Dijkstra
// ============================================================================

/// Min-heap entry ordered by tentative distance.
struct MinEntry {
    dist: f64,
    id: PersonId,
}

impl PartialEq for MinEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for MinEntry {}

impl PartialOrd for MinEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the std max-heap pops the smallest distance first.
        other.dist.total_cmp(&self.dist)
    }
}

/// Classic single-source Dijkstra over non-negative weights.
///
/// No decrease-key: improving a neighbor reinserts it, and stale duplicate
/// entries for already-visited nodes are discarded when popped.
fn dijkstra(
    ids: &[PersonId],
    adjacency: &HashMap<PersonId, Vec<(PersonId, f64)>>,
    source: PersonId,
) -> HashMap<PersonId, f64> {
    let mut dist: HashMap<PersonId, f64> =
        ids.iter().map(|id| (*id, f64::INFINITY)).collect();
    if !dist.contains_key(&source) {
        return dist;
    }
    dist.insert(source, 0.0);

    let mut visited: HashSet<PersonId> = HashSet::new();
    let mut heap = BinaryHeap::new();
    heap.push(MinEntry { dist: 0.0, id: source });

    while let Some(MinEntry { dist: cur_dist, id }) = heap.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(neighbors) = adjacency.get(&id) else {
            continue;
        };
        for &(next, weight) in neighbors {
            // Defensive: NaN weights never survive materialization.
            if weight.is_nan() {
                continue;
            }
            let candidate = cur_dist + weight;
            let entry = dist.entry(next).or_insert(f64::INFINITY);
            if candidate < *entry {
                *entry = candidate;
                heap.push(MinEntry { dist: candidate, id: next });
            }
        }
    }
    dist
}

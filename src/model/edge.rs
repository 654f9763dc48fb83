//! Edge — a weighted arc in the derived distance graph.

use serde::{Deserialize, Serialize};

use super::PersonId;

/// A directed, weighted arc between two nodes.
///
/// Edges are generated in both directions for every qualifying tree
/// parent/child pair, so the derived graph is undirected in effect. The
/// weight is a geographic distance in kilometers and is never negative;
/// pairs whose distance comes out NaN are never materialized at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub src: PersonId,
    pub dst: PersonId,
    pub weight: f64,
}

impl Edge {
    pub fn new(src: PersonId, dst: PersonId, weight: f64) -> Self {
        Self { src, dst, weight }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} ({:.3} km)", self.src, self.dst, self.weight)
    }
}

//! Node — tree-structural wrapper around one Person.

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::{Edge, Person, PersonId};

/// One arena slot: the owned Person plus structural and scratch state.
///
/// Structural fields (`parent`, `children`) are identity handles into the
/// store's arena; ownership of the parent→child relation flows through the
/// arena itself, so there are no reference cycles to break. The partner
/// relation lives symmetrically on the two Persons.
///
/// Scratch fields (`edges`, `distances`) belong to the recompute pipeline
/// and are fully rebuilt — never patched — after every structural mutation.
#[derive(Debug, Clone)]
pub struct Node {
    pub person: Person,
    pub parent: Option<PersonId>,
    /// Child handles in insertion order.
    pub children: SmallVec<[PersonId; 4]>,
    /// Outgoing weighted arcs of the derived distance graph.
    pub edges: Vec<Edge>,
    /// Shortest known distance to every other node; +∞ when unreachable.
    pub distances: HashMap<PersonId, f64>,
}

impl Node {
    pub fn new(person: Person) -> Self {
        Self {
            person,
            parent: None,
            children: SmallVec::new(),
            edges: Vec::new(),
            distances: HashMap::new(),
        }
    }

    pub fn id(&self) -> PersonId {
        self.person.id()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

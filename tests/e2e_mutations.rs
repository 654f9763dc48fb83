//! End-to-end tests for the mutation protocol and forest invariants.
//!
//! Each test drives the public `TreeStore` API only, the way an embedding
//! application (or a GUI layer) would.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use kintree::{Error, Node, Person, PersonId, TreeObserver, TreeStore};

// ============================================================================
// Helpers
// ============================================================================

/// Walk the forest from the roots and assert every structural invariant:
/// acyclicity, parent/child symmetry, and that the roots partition the
/// whole arena.
fn assert_forest(store: &TreeStore) {
    let roots = store.roots();
    let mut seen: Vec<PersonId> = Vec::new();
    let mut stack: Vec<PersonId> = roots.iter().map(|n| n.id()).collect();

    for root in &roots {
        assert!(root.is_root(), "root list entry has a parent");
    }

    while let Some(id) = stack.pop() {
        assert!(!seen.contains(&id), "node {id} reached twice — cycle or double parent");
        seen.push(id);
        let node = store.find(id).expect("child handle must resolve");
        for child in &node.children {
            let child_node = store.find(*child).expect("child handle must resolve");
            assert_eq!(
                child_node.parent,
                Some(id),
                "child's parent back-reference disagrees with the child list"
            );
            stack.push(*child);
        }
    }

    assert_eq!(
        seen.len(),
        store.len(),
        "roots do not partition the arena — some node is unreachable"
    );
}

/// Observer that records which callbacks fired, in order.
#[derive(Default)]
struct Recorder {
    log: Mutex<Vec<String>>,
}

impl TreeObserver for Recorder {
    fn on_node_added(&self, node: &Node) {
        self.log.lock().unwrap().push(format!("added:{}", node.person.name));
    }
    fn on_parent_changed(
        &self,
        _child: PersonId,
        _old: Option<PersonId>,
        _new: Option<PersonId>,
    ) {
        self.log.lock().unwrap().push("parent_changed".into());
    }
    fn on_partner_changed(
        &self,
        _person: PersonId,
        _old: Option<PersonId>,
        _new: Option<PersonId>,
    ) {
        self.log.lock().unwrap().push("partner_changed".into());
    }
    fn on_person_updated(&self, _person: PersonId) {
        self.log.lock().unwrap().push("person_updated".into());
    }
    fn on_graph_changed(&self) {
        self.log.lock().unwrap().push("graph_changed".into());
    }
}

// ============================================================================
// Mutation protocol
// ============================================================================

#[test]
fn test_mutation_sequence_keeps_forest() {
    let store = TreeStore::new();
    let a = store.add_person(Person::new("A"), None).unwrap();
    let b = store.add_person(Person::new("B"), Some(a.id())).unwrap();
    let c = store.add_person(Person::new("C"), Some(b.id())).unwrap();
    let d = store.add_person(Person::new("D"), None).unwrap();
    assert_forest(&store);

    store.reassign_parent(c.id(), Some(d.id())).unwrap();
    assert_forest(&store);

    store.reassign_parent(b.id(), None).unwrap();
    assert_forest(&store);

    store.set_partner(a.id(), Some(d.id())).unwrap();
    assert_forest(&store);
}

#[test]
fn test_reassign_into_own_subtree_always_fails() {
    let store = TreeStore::new();
    let a = store.add_person(Person::new("A"), None).unwrap();
    let b = store.add_person(Person::new("B"), Some(a.id())).unwrap();
    let c = store.add_person(Person::new("C"), Some(b.id())).unwrap();
    let d = store.add_person(Person::new("D"), Some(c.id())).unwrap();

    // Every node in A's subtree is a forbidden parent for A.
    for descendant in [b.id(), c.id(), d.id()] {
        assert!(matches!(
            store.reassign_parent(a.id(), Some(descendant)),
            Err(Error::CycleDetected)
        ));
    }
    // A itself fails differently.
    assert!(matches!(
        store.reassign_parent(a.id(), Some(a.id())),
        Err(Error::SelfParent)
    ));
    assert_forest(&store);
}

#[test]
fn test_allowed_parents_matches_cycle_rule() {
    let store = TreeStore::new();
    let a = store.add_person(Person::new("A"), None).unwrap();
    let b = store.add_person(Person::new("B"), Some(a.id())).unwrap();
    store.add_person(Person::new("C"), Some(b.id())).unwrap();
    let d = store.add_person(Person::new("D"), None).unwrap();

    // Everything allowed_parents offers must be accepted by reassign_parent.
    for candidate in store.allowed_parents(b.id()) {
        store.reassign_parent(b.id(), Some(candidate.id())).unwrap();
        assert_forest(&store);
    }
    // And the subtree of B is never offered.
    let offered: Vec<PersonId> = store
        .allowed_parents(b.id())
        .iter()
        .map(|n| n.id())
        .collect();
    assert!(offered.contains(&d.id()));
    assert!(!offered.contains(&b.id()));
}

#[test]
fn test_partner_does_not_disturb_tree() {
    let store = TreeStore::new();
    let a = store.add_person(Person::new("A"), None).unwrap();
    let b = store.add_person(Person::new("B"), Some(a.id())).unwrap();

    store.set_partner(a.id(), Some(b.id())).unwrap();
    assert_forest(&store);
    assert_eq!(store.find(b.id()).unwrap().parent, Some(a.id()));

    store.set_partner(a.id(), None).unwrap();
    assert_forest(&store);
}

#[test]
fn test_set_partner_twice_is_single_observable_state() {
    let store = TreeStore::new();
    let a = store.add_person(Person::new("A"), None).unwrap();
    let b = store.add_person(Person::new("B"), None).unwrap();

    store.set_partner(a.id(), Some(b.id())).unwrap();
    let first = store.export();
    store.set_partner(a.id(), Some(b.id())).unwrap();
    let second = store.export();

    let mut first: Vec<_> = first.into_iter().map(|r| (r.id, r.partner_id)).collect();
    let mut second: Vec<_> = second.into_iter().map(|r| (r.id, r.partner_id)).collect();
    first.sort();
    second.sort();
    assert_eq!(first, second);
}

// ============================================================================
// Notifications
// ============================================================================

#[test]
fn test_observer_order_on_add() {
    let store = TreeStore::new();
    let recorder = Arc::new(Recorder::default());
    store.subscribe(recorder.clone());

    store.add_person(Person::new("Ada"), None).unwrap();

    let log = recorder.log.lock().unwrap().clone();
    assert_eq!(log, vec!["added:Ada", "graph_changed"]);
}

#[test]
fn test_observer_order_on_reassign_and_partner() {
    let store = TreeStore::new();
    let a = store.add_person(Person::new("A"), None).unwrap();
    let b = store.add_person(Person::new("B"), None).unwrap();

    let recorder = Arc::new(Recorder::default());
    store.subscribe(recorder.clone());

    store.reassign_parent(b.id(), Some(a.id())).unwrap();
    store.set_partner(a.id(), Some(b.id())).unwrap();
    store.update_person(a.id(), |p| p.name = "A2".into()).unwrap();

    let log = recorder.log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            "parent_changed",
            "graph_changed",
            "partner_changed",
            "graph_changed",
            "person_updated",
            "graph_changed",
        ]
    );
}

#[test]
fn test_noop_partner_calls_fire_nothing() {
    let store = TreeStore::new();
    let a = store.add_person(Person::new("A"), None).unwrap();
    let b = store.add_person(Person::new("B"), None).unwrap();
    store.set_partner(a.id(), Some(b.id())).unwrap();

    let recorder = Arc::new(Recorder::default());
    store.subscribe(recorder.clone());

    // Re-attaching an already-mutual pair is silent.
    store.set_partner(a.id(), Some(b.id())).unwrap();
    assert!(recorder.log.lock().unwrap().is_empty());

    // So is detaching an unpartnered person.
    let c = store.add_person(Person::new("C"), None).unwrap();
    recorder.log.lock().unwrap().clear();
    store.set_partner(c.id(), None).unwrap();
    assert!(recorder.log.lock().unwrap().is_empty());
}

#[test]
fn test_observer_may_reenter_store() {
    struct Reentrant {
        store: TreeStore,
        seen: Mutex<usize>,
    }
    impl TreeObserver for Reentrant {
        fn on_graph_changed(&self) {
            // Calling back into the store from a notification must not
            // deadlock; the mutation's lock is already released.
            *self.seen.lock().unwrap() = self.store.len();
        }
    }

    let store = TreeStore::new();
    let observer = Arc::new(Reentrant { store: store.clone(), seen: Mutex::new(0) });
    store.subscribe(observer.clone());

    store.add_person(Person::new("Ada"), None).unwrap();
    assert_eq!(*observer.seen.lock().unwrap(), 1);
}

// ============================================================================
// Property: random mutation sequences preserve the forest
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Reassign { child: usize, parent: Option<usize> },
    Partner { a: usize, b: Option<usize> },
}

fn op_strategy(n: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..n, proptest::option::of(0..n))
            .prop_map(|(child, parent)| Op::Reassign { child, parent }),
        (0..n, proptest::option::of(0..n)).prop_map(|(a, b)| Op::Partner { a, b }),
    ]
}

proptest! {
    #[test]
    fn prop_forest_invariant_under_random_mutations(
        ops in proptest::collection::vec(op_strategy(8), 1..40)
    ) {
        let store = TreeStore::new();
        let ids: Vec<PersonId> = (0..8)
            .map(|i| {
                store
                    .add_person(Person::new(format!("P{i}")), None)
                    .unwrap()
                    .id()
            })
            .collect();

        for op in ops {
            // Individual operations may legitimately fail (cycle, self
            // reference); the store must stay consistent either way.
            match op {
                Op::Reassign { child, parent } => {
                    let _ = store.reassign_parent(ids[child], parent.map(|p| ids[p]));
                }
                Op::Partner { a, b } => {
                    let _ = store.set_partner(ids[a], b.map(|p| ids[p]));
                }
            }
            assert_forest(&store);
        }

        // Partner symmetry holds at the end of any sequence.
        for id in &ids {
            if let Some(partner) = store.find(*id).unwrap().person.partner_id {
                let back = store.find(partner).unwrap().person.partner_id;
                prop_assert_eq!(back, Some(*id));
            }
        }
    }
}

//! # kintree — In-Memory Genealogical Graph Engine
//!
//! A mutable family forest — parent/child trees augmented with symmetric
//! partner links — plus a derived weighted distance graph between related
//! individuals, with all-pairs shortest paths and summary statistics.
//!
//! ## Design Principles
//!
//! 1. **Arena-first**: the store's identity map owns every `Node`; parent,
//!    child and partner references are identity handles, never pointers
//! 2. **Clean DTOs**: `Person`, `Node`, `Edge`, `TransferRecord` cross all
//!    boundaries
//! 3. **One lock, no reentrancy**: mutations edit under a single `RwLock`,
//!    then notify and recompute outside it
//! 4. **Rebuild, don't patch**: edges and distance tables are derived
//!    scratch state, rebuilt in full after every structural mutation
//!
//! ## Quick Start
//!
//! ```rust
//! # fn example() -> kintree::Result<()> {
//! use kintree::{Person, TreeStore};
//!
//! let store = TreeStore::new();
//!
//! let ada = store.add_person(
//!     Person::new("Ada").with_coordinates(-0.12, 51.50),
//!     None,
//! )?;
//! let bo = store.add_person(
//!     Person::new("Bo").with_coordinates(2.35, 48.85),
//!     Some(ada.id()),
//! )?;
//!
//! let table = store.shortest_paths_from(ada.id());
//! println!("Ada → Bo: {:.1} km", table[&bo.id()]);
//! println!("average: {:.1} km", store.distance_summary().average_km);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Collaborators
//!
//! | Concern | Boundary | Shipped impl |
//! |---------|----------|--------------|
//! | Geocoding | `Geocoder` trait | none (opaque capability) |
//! | Distance | `DistanceModel` trait | `SphericalMercator` |
//! | Notifications | `TreeObserver` trait | none (subscriber-supplied) |

// ============================================================================
// Modules
// ============================================================================

pub mod geo;
pub mod model;
pub mod observer;
pub mod store;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Edge, Node, Person, PersonId, TransferRecord};

// ============================================================================
// Re-exports: Collaborators
// ============================================================================

pub use geo::{DistanceModel, Geocoder, SphericalMercator};
pub use observer::TreeObserver;

// ============================================================================
// Re-exports: Store
// ============================================================================

pub use store::{DistanceSummary, TreeStore};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a person with id {0} already exists")]
    DuplicateIdentity(PersonId),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("a node cannot be its own parent")]
    SelfParent,

    #[error("a person cannot be their own partner")]
    SelfPartner,

    #[error("operation would make a node its own ancestor")]
    CycleDetected,
}

pub type Result<T> = std::result::Result<T, Error>;

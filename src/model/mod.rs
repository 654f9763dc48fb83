//! # Genealogical Graph Model
//!
//! Clean data types that define the family forest and its derived
//! distance graph. These types cross every boundary: store ↔ recompute
//! engine ↔ user.
//!
//! Design rule: NO locking, NO I/O here. This module is pure data.
//! The store owns every `Node` through its identity arena; parent,
//! child and partner references are identity handles into that arena,
//! never owning pointers.

pub mod person;
pub mod node;
pub mod edge;
pub mod transfer;

pub use person::{Person, PersonId};
pub use node::Node;
pub use edge::Edge;
pub use transfer::TransferRecord;

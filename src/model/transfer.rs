//! TransferRecord — the flat import/export representation of a person.
//!
//! This is the serialization boundary of the crate: a tree-structure-free
//! record carrying identity, display fields and the parent/partner
//! references as plain ids. Derived scratch state (edges, distance tables)
//! is never transferred; it is recomputed after import.

use serde::{Deserialize, Serialize};

use super::{Person, PersonId};

/// Flat person record for bulk import/export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: PersonId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<PersonId>,
    #[serde(default)]
    pub partner_id: Option<PersonId>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub photo_reference: Option<String>,
    #[serde(default)]
    pub exclude_from_distance: bool,
}

impl From<&Person> for TransferRecord {
    fn from(p: &Person) -> Self {
        Self {
            id: p.id(),
            name: Some(p.name.clone()),
            parent_id: p.parent_id,
            partner_id: p.partner_id,
            latitude: p.lat,
            longitude: p.lon,
            photo_reference: p.photo.clone(),
            exclude_from_distance: p.exclude_from_distance,
        }
    }
}

impl TransferRecord {
    /// Rebuild a Person from this record, preserving identity.
    ///
    /// Fields the record does not carry (tag, birthdate, location code)
    /// come back at their defaults.
    pub fn into_person(self) -> Person {
        let mut p = Person::with_id(self.id, self.name.unwrap_or_default());
        p.parent_id = self.parent_id;
        p.partner_id = self.partner_id;
        p.lat = self.latitude;
        p.lon = self.longitude;
        p.photo = self.photo_reference;
        p.exclude_from_distance = self.exclude_from_distance;
        p
    }
}

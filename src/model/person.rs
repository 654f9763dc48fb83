//! Person — one individual in the family forest.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Geocoder;

/// Opaque person identifier. Globally unique, immutable after creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PersonId(pub Uuid);

impl PersonId {
    /// Mint a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One individual: identity plus mutable demographic and geographic state.
///
/// `parent_id` and `partner_id` are identity references into the store's
/// arena, not pointers. A reference to an identity that is absent from the
/// store is tolerated — such a node behaves as a root / as unpartnered
/// rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    id: PersonId,
    /// Secondary human-assigned identifier, for display and lookup only.
    /// The store does not enforce uniqueness on it.
    pub tag: String,
    pub name: String,
    pub birthdate: Option<NaiveDate>,
    /// Opaque photo reference, resolved by an external image service.
    pub photo: Option<String>,
    /// Opaque location code (e.g. a plus code), decoded by a [`Geocoder`].
    pub location_code: Option<String>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub parent_id: Option<PersonId>,
    pub partner_id: Option<PersonId>,
    /// When set, no distance edge touching this person is materialized.
    pub exclude_from_distance: bool,
}

impl Person {
    /// Create a person with a fresh random identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(PersonId::random(), name)
    }

    /// Create a person under a caller-supplied identity (import path).
    pub fn with_id(id: PersonId, name: impl Into<String>) -> Self {
        Self {
            id,
            tag: String::new(),
            name: name.into(),
            birthdate: None,
            photo: None,
            location_code: None,
            lon: None,
            lat: None,
            parent_id: None,
            partner_id: None,
            exclude_from_distance: false,
        }
    }

    pub fn id(&self) -> PersonId {
        self.id
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_birthdate(mut self, date: NaiveDate) -> Self {
        self.birthdate = Some(date);
        self
    }

    pub fn with_coordinates(mut self, lon: f64, lat: f64) -> Self {
        self.lon = Some(lon);
        self.lat = Some(lat);
        self
    }

    pub fn with_location_code(mut self, code: impl Into<String>) -> Self {
        self.location_code = Some(code.into());
        self
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }

    pub fn with_parent(mut self, parent: PersonId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_partner(mut self, partner: PersonId) -> Self {
        self.partner_id = Some(partner);
        self
    }

    pub fn excluded(mut self) -> Self {
        self.exclude_from_distance = true;
        self
    }

    /// Age in whole years as of today, or None without a birthdate.
    pub fn age(&self) -> Option<u32> {
        let birth = self.birthdate?;
        let today = Local::now().date_naive();
        let mut years = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    pub fn has_coordinates(&self) -> bool {
        self.lon.is_some() && self.lat.is_some()
    }

    /// Fill lon/lat from the location code if they are absent.
    ///
    /// Returns true when the person ends up with coordinates, false when
    /// there is no code or the geocoder rejects it. Never errors — a bad
    /// code just leaves the person without coordinates.
    pub fn ensure_coordinates(&mut self, geocoder: &dyn Geocoder) -> bool {
        if self.has_coordinates() {
            return true;
        }
        let Some(code) = self.location_code.as_deref() else {
            return false;
        };
        match geocoder.try_decode(code) {
            Some((lon, lat)) => {
                self.lon = Some(lon);
                self.lat = Some(lat);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (tag={})", self.name, self.tag)
    }
}

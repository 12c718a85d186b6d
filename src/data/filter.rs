use std::collections::BTreeSet;

use serde::Serialize;

use super::model::{Dataset, Listing, Schema};
use super::onehot::GroupKind;

// ---------------------------------------------------------------------------
// Filter criteria: one immutable snapshot per interaction
// ---------------------------------------------------------------------------

/// Closed interval on `square_feet`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SquareFeetRange {
    pub lo: f64,
    pub hi: f64,
}

impl SquareFeetRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

/// Active filter state. Unset fields impose no constraint; set fields are
/// AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterCriteria {
    /// State indicator column (`state_CA`) or its label (`CA`).
    pub state: Option<String>,
    /// Exact bathroom count.
    pub bathrooms: Option<u32>,
    pub square_feet: Option<SquareFeetRange>,
    /// Every selected amenity must be present (empty = no constraint).
    pub amenities: BTreeSet<String>,
}

impl FilterCriteria {
    /// Returns true if no filters are active.
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.bathrooms.is_none()
            && self.square_feet.is_none()
            && self.amenities.is_empty()
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_bathrooms(mut self, bathrooms: u32) -> Self {
        self.bathrooms = Some(bathrooms);
        self
    }

    pub fn with_square_feet(mut self, lo: f64, hi: f64) -> Self {
        self.square_feet = Some(SquareFeetRange::new(lo, hi));
        self
    }

    pub fn with_amenity(mut self, amenity: impl Into<String>) -> Self {
        self.amenities.insert(amenity.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Predicates: criteria resolved against a schema
// ---------------------------------------------------------------------------

/// A single row-membership test with column names already resolved to
/// positions. A `None` position means the name is not in the data, so
/// nothing matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    StateIs { indicator: Option<usize> },
    BathroomsEq(u32),
    SquareFeetWithin(SquareFeetRange),
    HasAmenity { amenity: Option<usize> },
}

impl Predicate {
    pub fn matches(&self, listing: &Listing) -> bool {
        match *self {
            Predicate::StateIs { indicator } => indicator.is_some_and(|i| listing.indicator(i)),
            Predicate::BathroomsEq(n) => listing.bathrooms == f64::from(n),
            Predicate::SquareFeetWithin(range) => range.contains(listing.square_feet),
            Predicate::HasAmenity { amenity } => amenity.is_some_and(|i| listing.has_amenity(i)),
        }
    }
}

/// Resolve criteria into predicates, one per set field and one per amenity.
pub fn compile(schema: &Schema, criteria: &FilterCriteria) -> Vec<Predicate> {
    let mut predicates = Vec::with_capacity(3 + criteria.amenities.len());

    if let Some(state) = &criteria.state {
        let indicator = schema
            .group(GroupKind::State)
            .and_then(|g| g.member(state))
            .map(|m| m.indicator);
        if indicator.is_none() {
            log::warn!("state '{state}' is not a column of the dataset; no listing matches");
        }
        predicates.push(Predicate::StateIs { indicator });
    }

    if let Some(n) = criteria.bathrooms {
        predicates.push(Predicate::BathroomsEq(n));
    }

    if let Some(range) = criteria.square_feet {
        predicates.push(Predicate::SquareFeetWithin(range));
    }

    for name in &criteria.amenities {
        let amenity = schema.amenity_index(name);
        if amenity.is_none() {
            log::warn!("amenity '{name}' is not a column of the dataset; no listing matches");
        }
        predicates.push(Predicate::HasAmenity { amenity });
    }

    predicates
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// Rows of a dataset that passed one criteria snapshot. Holds indices only.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn schema(&self) -> &'a Schema {
        &self.dataset.schema
    }

    /// Indices into `Dataset::listings`, in dataset order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Matching listings in dataset order.
    pub fn listings(&self) -> impl Iterator<Item = &'a Listing> + '_ {
        let listings = &self.dataset.listings;
        self.indices.iter().map(move |&i| &listings[i])
    }
}

/// Return the view of listings that pass all active filters.
pub fn apply<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilteredView<'a> {
    if criteria.is_empty() {
        return FilteredView {
            dataset,
            indices: (0..dataset.len()).collect(),
        };
    }
    let predicates = compile(&dataset.schema, criteria);
    let view = apply_predicates(dataset, &predicates);
    log::debug!(
        "filter kept {} of {} listings ({} predicates)",
        view.len(),
        dataset.len(),
        predicates.len()
    );
    view
}

/// Keep the listings that satisfy every predicate, in the given order.
pub fn apply_predicates<'a>(dataset: &'a Dataset, predicates: &[Predicate]) -> FilteredView<'a> {
    let indices = dataset
        .listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| predicates.iter().all(|p| p.matches(listing)))
        .map(|(i, _)| i)
        .collect();
    FilteredView { dataset, indices }
}

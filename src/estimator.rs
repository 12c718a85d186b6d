//! Linear price simulator.
//!
//! Independent of the dataset and the filters: it only needs the fitted
//! coefficient table and the simulator inputs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::data::onehot::GroupKind;

// ---------------------------------------------------------------------------
// Coefficient table
// ---------------------------------------------------------------------------

/// Fitted-model coefficients keyed by variable name (`cityname_Austin`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoefficientTable {
    entries: BTreeMap<String, f64>,
}

impl CoefficientTable {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, variable: &str) -> Option<f64> {
        self.entries.get(variable).copied()
    }

    /// Coefficient of a city variable; an unknown city contributes nothing.
    pub fn city_coefficient(&self, city: &str) -> f64 {
        self.get(city).unwrap_or(0.0)
    }

    /// City variables and their coefficients, in name order.
    pub fn city_coefficients(&self) -> Vec<(&str, f64)> {
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with(GroupKind::City.prefix()))
            .map(|(k, v)| (k.as_str(), *v))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Fixed model terms
// ---------------------------------------------------------------------------

/// Per-unit terms of the fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub per_bathroom: f64,
    pub per_square_foot: f64,
}

impl Default for LinearModel {
    fn default() -> Self {
        Self {
            per_bathroom: 297.0,
            per_square_foot: 0.63,
        }
    }
}

/// Signed price adjustment per amenity.
#[derive(Debug, Clone, PartialEq)]
pub struct AmenityAdjustments {
    table: BTreeMap<String, f64>,
}

impl Default for AmenityAdjustments {
    fn default() -> Self {
        Self::from_entries([
            ("Elevator", 251.1930144710353),
            ("Parking", 160.13931935370934),
            ("Clubhouse", 50.78495715235734),
            ("Playground", -87.51470430284112),
            ("Internet Access", 86.6327185048433),
            ("Garbage Disposal", -91.06921202021972),
            ("Pool", 87.19850857859029),
        ])
    }
}

impl AmenityAdjustments {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            table: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Adjustment for one amenity; amenities outside the table add nothing.
    pub fn adjustment(&self, amenity: &str) -> f64 {
        self.table.get(amenity).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Raw simulator inputs as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorInput {
    pub bathrooms: Option<f64>,
    pub square_feet: Option<f64>,
    /// City variable, e.g. `cityname_Austin`.
    pub city: Option<String>,
    pub amenities: BTreeSet<String>,
}

/// Result of one estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Estimate {
    Price(f64),
    /// Names of the required inputs that were missing.
    IncompleteInput { missing: Vec<&'static str> },
}

impl Estimate {
    pub fn price(&self) -> Option<f64> {
        match self {
            Estimate::Price(p) => Some(*p),
            Estimate::IncompleteInput { .. } => None,
        }
    }

    /// Text shown next to the simulator.
    pub fn message(&self) -> String {
        match self {
            Estimate::Price(p) => format!("Estimated price: ${p:.2}"),
            Estimate::IncompleteInput { missing } => format!(
                "Enter all values to get an estimate (missing: {}).",
                missing.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PriceEstimator {
    model: LinearModel,
    coefficients: Arc<CoefficientTable>,
    adjustments: AmenityAdjustments,
}

impl PriceEstimator {
    pub fn new(coefficients: Arc<CoefficientTable>) -> Self {
        Self {
            model: LinearModel::default(),
            coefficients,
            adjustments: AmenityAdjustments::default(),
        }
    }

    pub fn with_model(mut self, model: LinearModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_adjustments(mut self, adjustments: AmenityAdjustments) -> Self {
        self.adjustments = adjustments;
        self
    }

    pub fn coefficients(&self) -> &CoefficientTable {
        &self.coefficients
    }

    /// `bathrooms·B + square_feet·S + city + Σ amenity adjustments`.
    ///
    /// Bathrooms, size and city are required; zero or blank counts as
    /// missing.
    pub fn estimate(&self, input: &SimulatorInput) -> Estimate {
        let bathrooms = input.bathrooms.filter(|v| *v != 0.0);
        let square_feet = input.square_feet.filter(|v| *v != 0.0);
        let city = input.city.as_deref().map(str::trim).filter(|c| !c.is_empty());

        let (Some(bathrooms), Some(square_feet), Some(city)) = (bathrooms, square_feet, city) else {
            let mut missing = Vec::new();
            if bathrooms.is_none() {
                missing.push("bathrooms");
            }
            if square_feet.is_none() {
                missing.push("square feet");
            }
            if city.is_none() {
                missing.push("city");
            }
            return Estimate::IncompleteInput { missing };
        };

        let amenities: f64 = input
            .amenities
            .iter()
            .map(|a| self.adjustments.adjustment(a))
            .sum();

        Estimate::Price(
            bathrooms * self.model.per_bathroom
                + square_feet * self.model.per_square_foot
                + self.coefficients.city_coefficient(city)
                + amenities,
        )
    }
}

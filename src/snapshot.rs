//! One evaluation cycle per interaction.
//!
//! A cycle takes one criteria snapshot, derives one [`FilteredView`] and
//! computes every aggregate from that same view. Results carry a generation
//! so a slower, older cycle can never overwrite a newer one on screen.
//!
//! A cycle always produces a snapshot. An aggregate that has to decode
//! malformed rows fails on its own field; the others are still published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::data::aggregate::{
    self, AmenityAverage, AmenityCorrelation, CityPriceSummary, GroupedPriceStats, Kpis, MapPoint,
};
use crate::data::filter::{self, FilterCriteria, FilteredView};
use crate::data::model::Dataset;
use crate::data::onehot::DecodeError;

/// Everything a cycle needs besides the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub generation: u64,
    pub criteria: FilterCriteria,
    /// Grouping axis key for the boxplot (`photos` / `pets`).
    pub axis_key: String,
    /// Amenities to correlate with price; empty means all.
    pub amenity_subset: Vec<String>,
}

/// All dashboard numbers for one interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub generation: u64,
    pub criteria: FilterCriteria,
    pub kpis: Kpis,
    /// Fails alone when a listing has no single photo / pets column.
    pub grouped: Result<GroupedPriceStats, DecodeError>,
    pub correlations: Vec<AmenityCorrelation>,
    pub amenity_averages: Vec<AmenityAverage>,
    pub city_summary: CityPriceSummary,
    pub map_points: Vec<MapPoint>,
}

impl DashboardSnapshot {
    /// First data error among the aggregates, if any.
    pub fn error(&self) -> Option<&DecodeError> {
        self.grouped.as_ref().err()
    }
}

/// Run one cycle: a single `filter::apply`, then every aggregate over that
/// view.
pub fn evaluate(dataset: &Dataset, request: EvaluationRequest) -> DashboardSnapshot {
    let view = filter::apply(dataset, &request.criteria);
    evaluate_view(&view, request)
}

/// Compute every aggregate from an already-filtered view. The independent
/// computations run in parallel and all borrow the same view.
pub fn evaluate_view(view: &FilteredView<'_>, request: EvaluationRequest) -> DashboardSnapshot {
    let subset = &request.amenity_subset;
    let ((kpis, map_points), ((grouped, city_summary), (correlations, amenity_averages))) = rayon::join(
        || (aggregate::kpis(view), aggregate::price_points(view)),
        || {
            rayon::join(
                || {
                    (
                        aggregate::grouped_price_stats(view, &request.axis_key),
                        aggregate::city_price_summary(view),
                    )
                },
                || {
                    (
                        aggregate::amenity_price_correlation(view, subset),
                        aggregate::amenity_average_prices(view, subset),
                    )
                },
            )
        },
    );

    if let Err(e) = &grouped {
        log::warn!("grouped price statistics unavailable: {e}");
    }

    DashboardSnapshot {
        generation: request.generation,
        kpis,
        grouped,
        correlations,
        amenity_averages,
        city_summary,
        map_points,
        criteria: request.criteria,
    }
}

// ---------------------------------------------------------------------------
// Last-write-wins publication
// ---------------------------------------------------------------------------

/// Holds the snapshot on display. Generations are handed out by the slot and
/// a published snapshot replaces the current one only if it is newer.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    next_generation: AtomicU64,
    current: Mutex<Option<Arc<DashboardSnapshot>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the generation for a new interaction.
    pub fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Offer a finished snapshot. Returns false, and drops it, if a newer
    /// one is already on display.
    pub fn publish(&self, snapshot: DashboardSnapshot) -> bool {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if current
            .as_ref()
            .is_some_and(|shown| shown.generation >= snapshot.generation)
        {
            log::debug!("dropping stale snapshot generation {}", snapshot.generation);
            return false;
        }
        *current = Some(Arc::new(snapshot));
        true
    }

    /// Snapshot currently on display.
    pub fn latest(&self) -> Option<Arc<DashboardSnapshot>> {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Forget the displayed snapshot (e.g. after a new dataset is loaded).
    /// Generations keep increasing.
    pub fn clear(&self) {
        match self.current.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

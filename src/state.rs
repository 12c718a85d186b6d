use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::data::aggregate::GroupingAxis;
use crate::data::filter::{FilterCriteria, SquareFeetRange};
use crate::data::loader;
use crate::data::model::{ColumnLayout, Dataset};
use crate::estimator::{CoefficientTable, Estimate, PriceEstimator, SimulatorInput};
use crate::snapshot::{self, DashboardSnapshot, EvaluationRequest, SnapshotSlot};

// ---------------------------------------------------------------------------
// Filter controls
// ---------------------------------------------------------------------------

/// Raw values of the filter widgets. Turned into an immutable
/// [`FilterCriteria`] at the start of every evaluation cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterControls {
    /// Selected state indicator column.
    pub state: Option<String>,
    pub bathrooms: Option<u32>,
    /// Size slider; starts at the full data range.
    pub square_feet: Option<(f64, f64)>,
    pub amenities: BTreeSet<String>,
}

impl FilterControls {
    fn for_dataset(dataset: &Dataset) -> Self {
        Self {
            square_feet: dataset.square_feet_bounds(),
            ..Default::default()
        }
    }

    pub fn to_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            state: self.state.clone(),
            bathrooms: self.bathrooms,
            square_feet: self.square_feet.map(|(lo, hi)| SquareFeetRange::new(lo, hi)),
            amenities: self.amenities.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file is opened).
    pub dataset: Option<Arc<Dataset>>,

    /// Which amenity columns to recognise when loading.
    pub layout: ColumnLayout,

    /// Price simulator bound to the loaded coefficients.
    pub estimator: PriceEstimator,

    /// Current filter widget values.
    pub controls: FilterControls,

    /// Boxplot grouping axis key.
    pub axis_key: String,

    /// Simulator widget values and the last estimate.
    pub simulator: SimulatorInput,
    pub estimate: Estimate,

    /// Latest published evaluation.
    pub snapshots: SnapshotSlot,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        let estimator = PriceEstimator::new(Arc::new(CoefficientTable::default()));
        let simulator = SimulatorInput::default();
        let estimate = estimator.estimate(&simulator);
        Self {
            dataset: None,
            layout: ColumnLayout::default(),
            estimator,
            controls: FilterControls::default(),
            axis_key: GroupingAxis::PhotoPresence.key().to_string(),
            simulator,
            estimate,
            snapshots: SnapshotSlot::new(),
            status_message: None,
            loading: false,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded dataset, reset the filters and evaluate.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.controls = FilterControls::for_dataset(&dataset);
        self.dataset = Some(Arc::new(dataset));
        self.snapshots.clear();
        self.status_message = None;
        self.loading = false;
        self.refresh();
    }

    /// Replace the coefficient table and re-run the simulator.
    pub fn set_coefficients(&mut self, table: CoefficientTable) {
        self.estimator = PriceEstimator::new(Arc::new(table));
        self.update_estimate();
    }

    /// Load a listings file, reporting failures in the status line.
    pub fn open_dataset(&mut self, path: &Path) {
        self.loading = true;
        match loader::load_file(path, &self.layout) {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load '{}': {e:#}", path.display());
                self.status_message = Some(format!("Error: {e:#}"));
                self.loading = false;
            }
        }
    }

    /// Load a coefficient file, reporting failures in the status line.
    pub fn open_coefficients(&mut self, path: &Path) {
        match loader::load_coefficients(path) {
            Ok(table) => self.set_coefficients(table),
            Err(e) => {
                log::error!("Failed to load coefficients '{}': {e:#}", path.display());
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Run one evaluation cycle for the current controls and publish it.
    /// The status line reflects this cycle only.
    pub fn refresh(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        let request = EvaluationRequest {
            generation: self.snapshots.next_generation(),
            criteria: self.controls.to_criteria(),
            axis_key: self.axis_key.clone(),
            amenity_subset: Vec::new(),
        };
        let snap = snapshot::evaluate(dataset, request);
        self.status_message = snap.error().map(|e| {
            log::error!("Evaluation incomplete: {e}");
            format!("Data error: {e}")
        });
        self.snapshots.publish(snap);
    }

    /// Snapshot currently on display.
    pub fn snapshot(&self) -> Option<Arc<DashboardSnapshot>> {
        self.snapshots.latest()
    }

    pub fn set_state(&mut self, state: Option<String>) {
        self.controls.state = state;
        self.refresh();
    }

    pub fn set_bathrooms(&mut self, bathrooms: Option<u32>) {
        self.controls.bathrooms = bathrooms;
        self.refresh();
    }

    pub fn set_square_feet(&mut self, lo: f64, hi: f64) {
        self.controls.square_feet = Some((lo, hi));
        self.refresh();
    }

    /// Toggle a single amenity in the filter.
    pub fn toggle_amenity(&mut self, amenity: &str) {
        if !self.controls.amenities.remove(amenity) {
            self.controls.amenities.insert(amenity.to_string());
        }
        self.refresh();
    }

    pub fn set_axis(&mut self, axis_key: &str) {
        self.axis_key = axis_key.to_string();
        self.refresh();
    }

    /// Reset every filter to its unconstrained value.
    pub fn clear_filters(&mut self) {
        self.controls = match &self.dataset {
            Some(ds) => FilterControls::for_dataset(ds),
            None => FilterControls::default(),
        };
        self.refresh();
    }

    /// Recompute the simulator output from its inputs.
    pub fn update_estimate(&mut self) {
        self.estimate = self.estimator.estimate(&self.simulator);
    }
}

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use rent_scope::data::model::KNOWN_AMENITIES;
use rent_scope::data::onehot::GroupKind;
use rent_scope::estimator::Estimate;
use rent_scope::state::AppState;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open listings…").clicked() {
                open_dataset_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open coefficients…").clicked() {
                open_coefficients_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let visible = state
                .snapshot()
                .map(|s| s.kpis.listing_count)
                .unwrap_or_default();
            ui.label(format!("{} listings loaded, {visible} visible", ds.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Headline numbers of the current snapshot.
pub fn kpi_row(ui: &mut Ui, state: &AppState) {
    let Some(snapshot) = state.snapshot() else {
        return;
    };
    let k = &snapshot.kpis;
    let fmt_avg = |v: Option<f64>, prefix: &str| match v {
        Some(v) => format!("{prefix}{v:.2}"),
        None => "–".to_string(),
    };

    ui.horizontal(|ui: &mut Ui| {
        kpi(ui, "Cities", k.city_coverage_count.to_string());
        kpi(ui, "Apartments", k.listing_count.to_string());
        kpi(ui, "Average price", fmt_avg(k.average_price, "$"));
        kpi(ui, "Description length", fmt_avg(k.average_description_length, ""));
    });
}

fn kpi(ui: &mut Ui, title: &str, value: String) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(title).small());
            ui.label(RichText::new(value).heading().strong());
        });
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => ds.clone(),
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- State ----
            ui.strong("State");
            let mut selected = state.controls.state.clone();
            let current = selected
                .as_deref()
                .map(|c| c.trim_start_matches(GroupKind::State.prefix()).to_string())
                .unwrap_or_else(|| "All states".to_string());
            egui::ComboBox::from_id_salt("state_filter")
                .selected_text(current)
                .show_ui(ui, |ui: &mut Ui| {
                    ui.selectable_value(&mut selected, None, "All states");
                    if let Some(group) = dataset.schema.group(GroupKind::State) {
                        for member in &group.members {
                            ui.selectable_value(&mut selected, Some(member.column.clone()), member.label.as_str());
                        }
                    }
                });
            if selected != state.controls.state {
                state.set_state(selected);
            }
            ui.separator();

            // ---- Bathrooms (exact count) ----
            ui.strong("Bathrooms");
            let mut any = state.controls.bathrooms.is_none();
            let mut count = state.controls.bathrooms.unwrap_or(1);
            ui.horizontal(|ui: &mut Ui| {
                ui.checkbox(&mut any, "Any");
                ui.add_enabled(!any, egui::DragValue::new(&mut count).range(1..=10));
            });
            let bathrooms = (!any).then_some(count);
            if bathrooms != state.controls.bathrooms {
                state.set_bathrooms(bathrooms);
            }
            ui.separator();

            // ---- Square feet range ----
            if let (Some((min, max)), Some((lo, hi))) =
                (dataset.square_feet_bounds(), state.controls.square_feet)
            {
                ui.strong("Size (sq ft)");
                let (mut new_lo, mut new_hi) = (lo, hi);
                ui.add(egui::Slider::new(&mut new_lo, min..=max).step_by(100.0).text("from"));
                ui.add(egui::Slider::new(&mut new_hi, min..=max).step_by(100.0).text("to"));
                if new_lo > new_hi {
                    std::mem::swap(&mut new_lo, &mut new_hi);
                }
                if (new_lo, new_hi) != (lo, hi) {
                    state.set_square_feet(new_lo, new_hi);
                }
                ui.separator();
            }

            // ---- Amenities ----
            egui::CollapsingHeader::new(RichText::new(format!(
                "Amenities  ({} selected)",
                state.controls.amenities.len()
            ))
            .strong())
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                for amenity in &dataset.schema.amenities {
                    let mut checked = state.controls.amenities.contains(amenity);
                    if ui.checkbox(&mut checked, amenity.as_str()).changed() {
                        state.toggle_amenity(amenity);
                    }
                }
            });

            ui.separator();
            if ui.button("Clear filters").clicked() {
                state.clear_filters();
            }
        });
}

// ---------------------------------------------------------------------------
// Right side panel – price simulator
// ---------------------------------------------------------------------------

/// Render the price simulator.
pub fn simulator_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Price simulator");
    ui.separator();

    let mut changed = false;
    let sim = &mut state.simulator;

    let mut bathrooms = sim.bathrooms.unwrap_or(0.0);
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Bathrooms");
        changed |= ui
            .add(egui::DragValue::new(&mut bathrooms).range(0.0..=10.0).speed(0.5))
            .changed();
    });
    sim.bathrooms = Some(bathrooms);

    let mut square_feet = sim.square_feet.unwrap_or(0.0);
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Size (sq ft)");
        changed |= ui
            .add(egui::DragValue::new(&mut square_feet).range(0.0..=20_000.0).speed(10.0))
            .changed();
    });
    sim.square_feet = Some(square_feet);

    // City options come from the dataset when loaded, else from the model.
    let cities: Vec<String> = match state.dataset.as_ref().and_then(|ds| ds.schema.group(GroupKind::City)) {
        Some(group) => group.members.iter().map(|m| m.column.clone()).collect(),
        None => state
            .estimator
            .coefficients()
            .city_coefficients()
            .into_iter()
            .map(|(c, _)| c.to_string())
            .collect(),
    };
    let current = sim
        .city
        .as_deref()
        .map(|c| c.trim_start_matches(GroupKind::City.prefix()).to_string())
        .unwrap_or_else(|| "Select a city".to_string());
    egui::ComboBox::from_id_salt("sim_city")
        .selected_text(current)
        .show_ui(ui, |ui: &mut Ui| {
            for city in &cities {
                let label = city.trim_start_matches(GroupKind::City.prefix());
                changed |= ui
                    .selectable_value(&mut sim.city, Some(city.clone()), label)
                    .changed();
            }
        });

    ui.separator();
    ScrollArea::vertical()
        .id_salt("sim_amenities")
        .max_height(260.0)
        .show(ui, |ui: &mut Ui| {
            for amenity in KNOWN_AMENITIES {
                let mut checked = sim.amenities.contains(*amenity);
                if ui.checkbox(&mut checked, *amenity).changed() {
                    if checked {
                        sim.amenities.insert(amenity.to_string());
                    } else {
                        sim.amenities.remove(*amenity);
                    }
                    changed = true;
                }
            }
        });

    if changed {
        state.update_estimate();
    }

    ui.separator();
    let text = RichText::new(state.estimate.message()).heading();
    match state.estimate {
        Estimate::Price(_) => ui.label(text.strong()),
        Estimate::IncompleteInput { .. } => ui.label(text.color(Color32::GRAY)),
    };
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open listings data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_dataset(&path);
    }
}

pub fn open_coefficients_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open model coefficients")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.open_coefficients(&path);
    }
}

use eframe::egui::{Color32, RichText, ScrollArea, Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Plot, PlotPoints, Points};
use rent_scope::data::aggregate::{GroupedPriceStats, GroupingAxis};
use rent_scope::data::onehot::GroupKind;
use rent_scope::snapshot::DashboardSnapshot;
use rent_scope::state::AppState;

use crate::color::{generate_palette, PriceScale};

const CHART_HEIGHT: f32 = 280.0;
const TOP_CITIES: usize = 15;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render every chart of the current snapshot.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a listings file to start  (File → Open listings…)");
        });
        return;
    }
    let Some(snapshot) = state.snapshot() else {
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.columns(2, |cols| {
                price_map(&mut cols[0], &snapshot);
                grouped_boxplot(&mut cols[1], state, &snapshot);
            });
            ui.separator();
            ui.columns(2, |cols| {
                correlation_chart(&mut cols[0], &snapshot);
                amenity_average_chart(&mut cols[1], &snapshot);
            });
            ui.separator();
            city_table(ui, state, &snapshot);
        });
}

// ---------------------------------------------------------------------------
// Price map
// ---------------------------------------------------------------------------

fn price_map(ui: &mut Ui, snapshot: &DashboardSnapshot) {
    ui.strong("Price by location");
    let scale = PriceScale::from_points(&snapshot.map_points);

    Plot::new("price_map")
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show(ui, |plot_ui| {
            let Some(scale) = scale else {
                return;
            };
            let mut buckets: Vec<Vec<[f64; 2]>> = vec![Vec::new(); PriceScale::BUCKETS];
            for p in &snapshot.map_points {
                buckets[scale.bucket(p.price)].push([p.longitude, p.latitude]);
            }
            for (bucket, points) in buckets.into_iter().enumerate() {
                if points.is_empty() {
                    continue;
                }
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .radius(2.5)
                        .color(scale.bucket_color(bucket))
                        .name(format!("≥ ${:.0}", scale.bucket_floor(bucket))),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Boxplot by photo presence / pets policy
// ---------------------------------------------------------------------------

fn grouped_boxplot(ui: &mut Ui, state: &mut AppState, snapshot: &DashboardSnapshot) {
    ui.horizontal(|ui: &mut Ui| {
        let mut axis_key = state.axis_key.clone();
        for axis in GroupingAxis::all() {
            let label = match axis.group_kind() {
                GroupKind::Photo => "Has photos",
                _ => "Pets allowed",
            };
            ui.radio_value(&mut axis_key, axis.key().to_string(), label);
        }
        if axis_key != state.axis_key {
            state.set_axis(&axis_key);
        }
    });

    let categories = match &snapshot.grouped {
        Ok(GroupedPriceStats::Grouped { axis, categories }) => {
            ui.strong(axis.title());
            categories
        }
        Ok(GroupedPriceStats::UnsupportedAxis { requested }) => {
            ui.label(format!("Category '{requested}' is not available in the data"));
            return;
        }
        Err(e) => {
            ui.label(RichText::new(format!("Cannot group prices: {e}")).color(Color32::RED));
            return;
        }
    };

    let palette = generate_palette(categories.len());
    Plot::new("price_boxplot")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .y_axis_label("Price")
        .show(ui, |plot_ui| {
            for (i, (category, color)) in categories.iter().zip(&palette).enumerate() {
                let s = category.summary;
                let x = i as f64;
                let elem = BoxElem::new(x, BoxSpread::new(s.min, s.q1, s.median, s.q3, s.max))
                    .name(format!("{} (n={})", category.label, category.count()))
                    .box_width(0.5)
                    .fill(color.linear_multiply(0.3))
                    .stroke(Stroke::new(1.5, *color));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&category.label));

                let points: PlotPoints = category.prices.iter().map(|&p| [x + 0.35, p]).collect();
                plot_ui.points(Points::new(points).radius(1.5).color(*color));
            }
        });
}

// ---------------------------------------------------------------------------
// Amenity charts
// ---------------------------------------------------------------------------

fn correlation_chart(ui: &mut Ui, snapshot: &DashboardSnapshot) {
    ui.strong("Amenity / price correlation");

    let mut undefined = Vec::new();
    let bars: Vec<Bar> = snapshot
        .correlations
        .iter()
        .filter_map(|c| match c.correlation.value() {
            Some(r) => Some((c.amenity.as_str(), r)),
            None => {
                undefined.push(c.amenity.as_str());
                None
            }
        })
        .enumerate()
        .map(|(i, (amenity, r))| {
            let color = if r >= 0.0 { Color32::LIGHT_GREEN } else { Color32::LIGHT_RED };
            Bar::new(i as f64, r).name(amenity).fill(color)
        })
        .collect();

    Plot::new("amenity_correlation")
        .height(CHART_HEIGHT)
        .include_y(-1.0)
        .include_y(1.0)
        .y_axis_label("Pearson r")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("correlation"));
        });

    if !undefined.is_empty() {
        ui.label(
            RichText::new(format!("Undefined for: {}", undefined.join(", ")))
                .small()
                .color(Color32::GRAY),
        );
    }
}

fn amenity_average_chart(ui: &mut Ui, snapshot: &DashboardSnapshot) {
    ui.strong("Average price by amenity");

    let bars: Vec<Bar> = snapshot
        .amenity_averages
        .iter()
        .filter_map(|a| a.average_price.map(|avg| (a, avg)))
        .enumerate()
        .map(|(i, (a, avg))| {
            Bar::new(i as f64, avg)
                .name(format!("{} (n={})", a.amenity, a.listings))
                .fill(Color32::LIGHT_BLUE)
        })
        .collect();

    Plot::new("amenity_average_price")
        .height(CHART_HEIGHT)
        .y_axis_label("Average price")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("average price"));
        });
}

// ---------------------------------------------------------------------------
// City table
// ---------------------------------------------------------------------------

fn city_table(ui: &mut Ui, state: &AppState, snapshot: &DashboardSnapshot) {
    ui.strong(format!("Top {TOP_CITIES} cities"));
    let unresolved = snapshot.city_summary.unresolved;
    if unresolved > 0 {
        ui.label(
            RichText::new(format!("{unresolved} listings without a city column"))
                .small()
                .color(Color32::GRAY),
        );
    }
    let coefficients = state.estimator.coefficients();

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(160.0))
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(110.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("City");
            });
            header.col(|ui| {
                ui.strong("Listings");
            });
            header.col(|ui| {
                ui.strong("Average price");
            });
            header.col(|ui| {
                ui.strong("Model coefficient");
            });
        })
        .body(|mut body| {
            for city in snapshot.city_summary.cities.iter().take(TOP_CITIES) {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(city.label.as_str());
                    });
                    row.col(|ui| {
                        ui.label(city.listings.to_string());
                    });
                    row.col(|ui| {
                        ui.label(format!("${:.2}", city.average_price));
                    });
                    row.col(|ui| {
                        match coefficients.get(&city.column) {
                            Some(c) => ui.label(format!("{c:+.2}")),
                            None => ui.label("–"),
                        };
                    });
                });
            }
        });
}

mod app;
mod color;
mod ui;

use app::RentScopeApp;
use clap::Parser;
use eframe::egui;
use rent_scope::config::Config;
use rent_scope::state::AppState;

fn main() -> eframe::Result {
    let config = Config::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.default_log_filter()),
    )
    .init();

    let mut state = AppState::default();
    if let Some(path) = &config.coefficients {
        state.open_coefficients(path);
    }
    if let Some(path) = &config.data {
        state.open_dataset(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rent Scope – Rental Listings Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(RentScopeApp::new(state)))),
    )
}

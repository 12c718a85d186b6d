//! Rental-listings exploration: a one-hot listings table, composable filters,
//! statistics that always describe the same filtered rows, and a linear price
//! simulator.
//!
//! The egui shell lives in the `rent-scope` binary; everything here is
//! UI-independent.

pub mod config;
pub mod data;
pub mod estimator;
pub mod snapshot;
pub mod state;

//! fleet-planner
//!
//! Assigns delivery trips to capacity-constrained vehicles and reports
//! per-vehicle routes with distance, duration, fuel cost and efficiency.

pub mod cache;
pub mod clock;
pub mod config;
pub mod deadline;
pub mod error;
pub mod haversine;
pub mod matrix;
pub mod metrics;
pub mod models;
pub mod planner;
pub mod scoring;
pub mod solver;
pub mod traffic;
pub mod traits;

pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod models;

pub use error::{OptimizationError, Result};
pub use logic::engine::LayoutEngine;

pub mod assigner;
pub mod cache;
pub mod compatibility;
pub mod engine;
pub mod spacing;
pub mod utilization;

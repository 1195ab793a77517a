pub mod budget;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod manager;
pub mod output;
pub mod pricing;
pub mod registry;
pub mod selector;
pub mod store;
pub mod tracker;
pub mod types;
pub mod watch;

pub use error::{CostopsError, Result};
pub use manager::CostOptimizationManager;

pub mod api;
pub mod charts;
pub mod commands;
pub mod config;
pub mod error;
pub mod food;

// Re-export commonly used items
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use food::analysis::{ComparisonTable, Pivot, Selection};
pub use food::{FoodCatalog, NutrientSession};

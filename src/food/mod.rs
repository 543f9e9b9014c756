pub mod analysis;
pub mod api;
pub mod catalog;
pub mod config;
pub mod models;
pub mod session;

pub use catalog::FoodCatalog;
pub use models::{Food, FoodRecord, NutrientAmount, NutrientKey, Unit};
pub use session::NutrientSession;

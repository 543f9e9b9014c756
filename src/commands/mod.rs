pub mod food_cmd;

pub use food_cmd::{export_guidelines, fetch_database, list_all_foods, FetchOptions, FetchSummary};

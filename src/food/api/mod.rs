pub mod mock;
pub mod usda;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::food::models::FoodRecord;

// Re-export common types
pub use mock::MockFoodSource;
pub use usda::UsdaClient;

/// Data types the dashboard works with. Branded and survey foods are skipped.
pub const CATALOG_DATA_TYPES: &[&str] = &["Foundation", "SR Legacy"];

/// Largest page the search endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 200;

/// One hit from a search or listing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSummary {
    pub fdc_id: u64,
    pub description: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPage {
    pub foods: Vec<FoodSummary>,
    pub total_hits: u64,
    pub total_pages: u32,
}

/// Read-only access to a nutrition database.
#[async_trait]
pub trait FoodSource: Send + Sync {
    async fn search_foods(&self, query: &str, page_size: u32) -> Result<Vec<FoodSummary>>;

    async fn list_foods(&self, page_number: u32, page_size: u32) -> Result<FoodPage>;

    async fn food_details(&self, fdc_id: u64) -> Result<FoodRecord>;
}

pub(crate) fn check_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(crate::error::DashboardError::invalid_input(format!(
            "Page size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

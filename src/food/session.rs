use std::num::NonZeroUsize;
use std::sync::Arc;

use log::{debug, info};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::RwLock;

use super::analysis::transform::{self, ComparisonTable, Pivot, Selection};
use super::analysis::{NutritionalGuidelines, RdaProfile};
use super::api::{FoodSource, FoodSummary};
use super::catalog::FoodCatalog;
use super::models::FoodRecord;
use crate::error::Result;

pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Everything one dashboard run needs: where foods come from, what has been
/// fetched so far, and the guideline table.
///
/// Per-food detail is memoized by FDC id, so re-running the pipeline for the
/// same selection does not hit the API again.
pub struct NutrientSession {
    source: Arc<dyn FoodSource>,
    catalog: RwLock<FoodCatalog>,
    memo: Mutex<LruCache<u64, FoodRecord>>,
    guidelines: NutritionalGuidelines,
    profile: RdaProfile,
}

impl NutrientSession {
    pub fn new(
        source: Arc<dyn FoodSource>,
        catalog: FoodCatalog,
        cache_size: usize,
        profile: RdaProfile,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_size)
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            source,
            catalog: RwLock::new(catalog),
            memo: Mutex::new(LruCache::new(capacity)),
            guidelines: NutritionalGuidelines::new(),
            profile,
        }
    }

    pub fn guidelines(&self) -> &NutritionalGuidelines {
        &self.guidelines
    }

    pub fn profile(&self) -> RdaProfile {
        self.profile
    }

    pub fn catalog(&self) -> &RwLock<FoodCatalog> {
        &self.catalog
    }

    /// Detail for one food, from the memo when possible.
    pub async fn fetch_food(&self, fdc_id: u64) -> Result<FoodRecord> {
        if let Some(record) = self.memo.lock().get(&fdc_id).cloned() {
            debug!("Detail cache hit for food {}", fdc_id);
            return Ok(record);
        }

        let record = self.source.food_details(fdc_id).await?;
        self.memo.lock().put(fdc_id, record.clone());
        Ok(record)
    }

    pub async fn search(&self, query: &str, page_size: u32) -> Result<Vec<FoodSummary>> {
        self.source.search_foods(query, page_size).await
    }

    /// Fetches a food and adds it to the catalog. Returns false when the
    /// catalog already held a food with the same description.
    pub async fn add_food(&self, fdc_id: u64) -> Result<bool> {
        let record = self.fetch_food(fdc_id).await?;
        let added = self.catalog.write().await.insert(record);
        if added {
            info!("Added food {} to the session catalog", fdc_id);
        }
        Ok(added)
    }

    /// Makes sure every selected food is in the catalog, fetching missing ones.
    pub async fn ensure_foods(&self, fdc_ids: &[u64]) -> Result<()> {
        let missing: Vec<u64> = {
            let catalog = self.catalog.read().await;
            fdc_ids
                .iter()
                .copied()
                .filter(|id| !catalog.contains(*id))
                .collect()
        };

        for fdc_id in missing {
            self.add_food(fdc_id).await?;
        }
        Ok(())
    }

    /// The whole pipeline for one interaction: fetch-or-cache, then pivot.
    pub async fn compare(&self, selection: &Selection, pivot: Pivot) -> Result<ComparisonTable> {
        if selection.is_empty() {
            return Ok(ComparisonTable::empty(pivot));
        }
        self.ensure_foods(&selection.foods).await?;

        let catalog = self.catalog.read().await;
        Ok(match pivot {
            Pivot::ByNutrient => transform::by_nutrient(&catalog, selection),
            Pivot::ByFood => transform::by_food(&catalog, selection),
        })
    }
}

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{check_page_size, FoodPage, FoodSource, FoodSummary};
use crate::error::{DashboardError, Result};
use crate::food::models::{Food, FoodRecord, NutrientAmount, NutrientKey, Unit, DEFAULT_SERVING_GRAMS};

/// In-memory food source for tests and offline demos (no API calls).
#[derive(Debug, Default)]
pub struct MockFoodSource {
    records: BTreeMap<u64, FoodRecord>,
    offline: bool,
    detail_requests: AtomicUsize,
}

impl MockFoodSource {
    /// A handful of SR Legacy foods with realistic per-100 g values.
    pub fn new() -> Self {
        Self::with_records(sample_records())
    }

    pub fn with_records(records: Vec<FoodRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.food.fdc_id, r)).collect(),
            offline: false,
            detail_requests: AtomicUsize::new(0),
        }
    }

    /// A source whose every call fails with a network error.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Number of `food_details` calls served so far.
    pub fn detail_requests(&self) -> usize {
        self.detail_requests.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(DashboardError::Network("mock source is offline".to_string()));
        }
        Ok(())
    }

    fn summary(record: &FoodRecord) -> FoodSummary {
        FoodSummary {
            fdc_id: record.food.fdc_id,
            description: record.food.description.clone(),
            data_type: record.food.category.clone(),
        }
    }
}

#[async_trait]
impl FoodSource for MockFoodSource {
    async fn search_foods(&self, query: &str, page_size: u32) -> Result<Vec<FoodSummary>> {
        self.check_online()?;
        if query.trim().is_empty() {
            return Err(DashboardError::invalid_input("Search query cannot be empty"));
        }
        check_page_size(page_size)?;

        let query_lower = query.to_lowercase();
        Ok(self
            .records
            .values()
            .filter(|r| r.food.description.to_lowercase().contains(&query_lower))
            .take(page_size as usize)
            .map(Self::summary)
            .collect())
    }

    async fn list_foods(&self, page_number: u32, page_size: u32) -> Result<FoodPage> {
        self.check_online()?;
        check_page_size(page_size)?;
        if page_number == 0 {
            return Err(DashboardError::invalid_input("Page numbers start at 1"));
        }

        let total = self.records.len() as u64;
        let total_pages = total.div_ceil(u64::from(page_size)) as u32;
        let skip = (page_number as usize - 1) * page_size as usize;

        Ok(FoodPage {
            foods: self
                .records
                .values()
                .skip(skip)
                .take(page_size as usize)
                .map(Self::summary)
                .collect(),
            total_hits: total,
            total_pages,
        })
    }

    async fn food_details(&self, fdc_id: u64) -> Result<FoodRecord> {
        self.check_online()?;
        self.detail_requests.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(&fdc_id)
            .cloned()
            .ok_or_else(|| DashboardError::not_found(format!("Food with FDC ID {}", fdc_id)))
    }
}

/// Builds a per-100 g record from `(name, unit, amount)` triples.
pub fn record(fdc_id: u64, description: &str, nutrients: &[(&str, &str, f64)]) -> FoodRecord {
    FoodRecord {
        food: Food {
            fdc_id,
            description: description.to_string(),
            category: "SR Legacy".to_string(),
            serving_size: DEFAULT_SERVING_GRAMS,
            serving_unit: "g".to_string(),
        },
        nutrients: nutrients
            .iter()
            .map(|(name, unit, amount)| {
                let unit = Unit::parse(unit);
                NutrientAmount {
                    fdc_id,
                    nutrient: NutrientKey::new(name, &unit),
                    amount: *amount,
                    unit,
                }
            })
            .collect(),
    }
}

pub fn sample_records() -> Vec<FoodRecord> {
    vec![
        record(
            171_688,
            "Apples, raw, with skin",
            &[
                ("Protein", "G", 0.26),
                ("Total lipid (fat)", "G", 0.17),
                ("Carbohydrate, by difference", "G", 13.81),
                ("Energy", "KCAL", 52.0),
                ("Fiber, total dietary", "G", 2.4),
                ("Vitamin C, total ascorbic acid", "MG", 4.6),
                ("Potassium, K", "MG", 107.0),
                ("Calcium, Ca", "MG", 6.0),
            ],
        ),
        record(
            173_944,
            "Bananas, raw",
            &[
                ("Protein", "G", 1.09),
                ("Total lipid (fat)", "G", 0.33),
                ("Carbohydrate, by difference", "G", 22.84),
                ("Energy", "KCAL", 89.0),
                ("Fiber, total dietary", "G", 2.6),
                ("Vitamin C, total ascorbic acid", "MG", 8.7),
                ("Vitamin B-6", "MG", 0.367),
                ("Potassium, K", "MG", 358.0),
                ("Magnesium, Mg", "MG", 27.0),
            ],
        ),
        record(
            171_477,
            "Chicken, broilers or fryers, breast, meat only, cooked, roasted",
            &[
                ("Protein", "G", 31.02),
                ("Total lipid (fat)", "G", 3.57),
                ("Energy", "KCAL", 165.0),
                ("Niacin", "MG", 13.712),
                ("Vitamin B-12", "UG", 0.34),
                ("Iron, Fe", "MG", 1.04),
                ("Zinc, Zn", "MG", 1.0),
                ("Sodium, Na", "MG", 74.0),
            ],
        ),
        record(
            168_462,
            "Spinach, raw",
            &[
                ("Protein", "G", 2.86),
                ("Total lipid (fat)", "G", 0.39),
                ("Carbohydrate, by difference", "G", 3.63),
                ("Energy", "KCAL", 23.0),
                ("Vitamin A, RAE", "UG", 469.0),
                ("Vitamin C, total ascorbic acid", "MG", 28.1),
                ("Vitamin K (phylloquinone)", "UG", 482.9),
                ("Folate, total", "UG", 194.0),
                ("Iron, Fe", "MG", 2.71),
                ("Calcium, Ca", "MG", 99.0),
                ("Magnesium, Mg", "MG", 79.0),
            ],
        ),
    ]
}

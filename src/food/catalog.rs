use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::food::models::{Food, FoodRecord, NutrientAmount, NutrientKey};

/// Foods and their nutrient amounts for one dashboard session.
///
/// Amounts are unique per (food, nutrient). Descriptions are unique too: a
/// second food with an already-known description is ignored.
#[derive(Debug, Clone, Default)]
pub struct FoodCatalog {
    foods: BTreeMap<u64, Food>,
    amounts: BTreeMap<u64, BTreeMap<NutrientKey, NutrientAmount>>,
    by_description: HashMap<String, u64>,
}

/// On-disk form of a catalog, written by the `fetch` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub foods: Vec<FoodRecord>,
}

impl FoodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = FoodRecord>) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }

    /// Adds or replaces a food. Returns false when another food already
    /// carries the same description.
    pub fn insert(&mut self, record: FoodRecord) -> bool {
        let fdc_id = record.food.fdc_id;
        match self.by_description.get(&record.food.description) {
            Some(&existing) if existing != fdc_id => return false,
            _ => {}
        }

        if let Some(previous) = self.foods.get(&fdc_id) {
            self.by_description.remove(&previous.description);
        }

        let amounts = record
            .nutrients
            .into_iter()
            .filter(|n| n.amount.is_finite())
            .map(|n| (n.nutrient.clone(), NutrientAmount { fdc_id, ..n }))
            .collect();

        self.by_description
            .insert(record.food.description.clone(), fdc_id);
        self.foods.insert(fdc_id, record.food);
        self.amounts.insert(fdc_id, amounts);
        true
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    pub fn contains(&self, fdc_id: u64) -> bool {
        self.foods.contains_key(&fdc_id)
    }

    pub fn food(&self, fdc_id: u64) -> Option<&Food> {
        self.foods.get(&fdc_id)
    }

    /// All foods ordered by description.
    pub fn foods(&self) -> Vec<&Food> {
        let mut foods: Vec<&Food> = self.foods.values().collect();
        foods.sort_by(|a, b| a.description.cmp(&b.description));
        foods
    }

    pub fn amount(&self, fdc_id: u64, nutrient: &NutrientKey) -> Option<&NutrientAmount> {
        self.amounts.get(&fdc_id)?.get(nutrient)
    }

    pub fn nutrients_of(&self, fdc_id: u64) -> impl Iterator<Item = &NutrientAmount> {
        self.amounts.get(&fdc_id).into_iter().flat_map(|m| m.values())
    }

    /// Every nutrient key reported by at least one food, sorted.
    pub fn available_nutrients(&self) -> Vec<NutrientKey> {
        let mut keys: Vec<NutrientKey> = self
            .amounts
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Looks a food up by name: exact description first, then a
    /// case-insensitive substring, then the substring with any
    /// parenthesized text removed.
    pub fn find_foods(&self, name: &str) -> Vec<&Food> {
        if let Some(&fdc_id) = self.by_description.get(name) {
            return self.foods.get(&fdc_id).into_iter().collect();
        }

        let needle = name.trim().to_lowercase();
        let matches = self.foods_containing(&needle);
        if !matches.is_empty() {
            return matches;
        }

        let simple = strip_parenthesized(name).trim().to_lowercase();
        if simple.is_empty() || simple == needle {
            return Vec::new();
        }
        self.foods_containing(&simple)
    }

    fn foods_containing(&self, needle: &str) -> Vec<&Food> {
        if needle.is_empty() {
            return Vec::new();
        }
        self.foods()
            .into_iter()
            .filter(|f| f.description.to_lowercase().contains(needle))
            .collect()
    }

    pub fn records(&self) -> Vec<FoodRecord> {
        self.foods()
            .into_iter()
            .map(|food| FoodRecord {
                food: food.clone(),
                nutrients: self.nutrients_of(food.fdc_id).cloned().collect(),
            })
            .collect()
    }

    /// Loads a snapshot. A missing file yields an empty catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("No food database at {}, starting with an empty catalog", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)?;
        let catalog = Self::from_records(snapshot.foods);
        info!(
            "Loaded {} foods from {} (fetched {})",
            catalog.len(),
            path.display(),
            snapshot.fetched_at.format("%Y-%m-%d %H:%M UTC")
        );
        Ok(catalog)
    }

    pub fn save(&self, path: impl AsRef<Path>, fetched_at: DateTime<Utc>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = CatalogSnapshot {
            fetched_at,
            foods: self.records(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        info!("Saved {} foods to {}", self.len(), path.display());
        Ok(())
    }
}

fn strip_parenthesized(s: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

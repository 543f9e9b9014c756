use std::collections::HashSet;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{check_page_size, FoodPage, FoodSource, FoodSummary, CATALOG_DATA_TYPES};
use crate::error::{DashboardError, Result};
use crate::food::config::FoodConfig;
use crate::food::models::{Food, FoodRecord, NutrientAmount, NutrientKey, Unit, DEFAULT_SERVING_GRAMS};

#[derive(Debug)]
pub struct UsdaClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
    #[serde(default)]
    total_hits: u64,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    fdc_id: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FoodDetailsResponse {
    fdc_id: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<FoodNutrientResponse>,
}

#[derive(Debug, Deserialize)]
struct FoodNutrientResponse {
    nutrient: Option<NutrientInfo>,
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NutrientInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    unit_name: String,
}

impl From<SearchFood> for FoodSummary {
    fn from(food: SearchFood) -> Self {
        Self {
            fdc_id: food.fdc_id,
            description: food.description,
            data_type: food.data_type.unwrap_or_default(),
        }
    }
}

impl UsdaClient {
    pub fn new(config: &FoodConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| DashboardError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DashboardError::not_found(format!("USDA resource {}", path)));
        }
        if !status.is_success() {
            return Err(DashboardError::Network(format!(
                "API request failed with status: {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::Network(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| DashboardError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FoodSource for UsdaClient {
    async fn search_foods(&self, query: &str, page_size: u32) -> Result<Vec<FoodSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DashboardError::invalid_input("Search query cannot be empty"));
        }
        check_page_size(page_size)?;

        let mut params = vec![
            ("query", query.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        params.extend(CATALOG_DATA_TYPES.iter().map(|t| ("dataType", t.to_string())));

        let response: SearchResponse = self.get_json("/foods/search", &params).await?;
        let mut foods: Vec<FoodSummary> = response.foods.into_iter().map(Into::into).collect();

        // Closest descriptions first; the sort is stable so API order breaks ties.
        foods.sort_by(|a, b| {
            string_similarity(&b.description, query)
                .partial_cmp(&string_similarity(&a.description, query))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(foods)
    }

    async fn list_foods(&self, page_number: u32, page_size: u32) -> Result<FoodPage> {
        check_page_size(page_size)?;
        if page_number == 0 {
            return Err(DashboardError::invalid_input("Page numbers start at 1"));
        }

        let mut params = vec![
            ("query", "*".to_string()),
            ("pageSize", page_size.to_string()),
            ("pageNumber", page_number.to_string()),
        ];
        params.extend(CATALOG_DATA_TYPES.iter().map(|t| ("dataType", t.to_string())));

        let response: SearchResponse = self.get_json("/foods/search", &params).await?;
        Ok(FoodPage {
            foods: response.foods.into_iter().map(Into::into).collect(),
            total_hits: response.total_hits,
            total_pages: response.total_pages,
        })
    }

    async fn food_details(&self, fdc_id: u64) -> Result<FoodRecord> {
        let response: FoodDetailsResponse = self.get_json(&format!("/food/{}", fdc_id), &[]).await?;
        Ok(record_from_details(response))
    }
}

/// Flattens a detail response into a record. Entries without a nutrient
/// descriptor or amount are dropped; a repeated nutrient keeps its first amount.
pub(crate) fn record_from_details(details: FoodDetailsResponse) -> FoodRecord {
    let fdc_id = details.fdc_id;
    let mut seen = HashSet::new();
    let mut nutrients = Vec::new();

    for entry in details.food_nutrients {
        let (Some(info), Some(amount)) = (entry.nutrient, entry.amount) else {
            continue;
        };
        if info.name.is_empty() || !amount.is_finite() {
            continue;
        }
        let unit = Unit::parse(&info.unit_name);
        let key = NutrientKey::new(&info.name, &unit);
        if !seen.insert(key.clone()) {
            warn!("Food {} reports {} more than once, keeping the first amount", fdc_id, key);
            continue;
        }
        nutrients.push(NutrientAmount {
            fdc_id,
            nutrient: key,
            amount,
            unit,
        });
    }

    FoodRecord {
        food: Food {
            fdc_id,
            description: details.description,
            category: details.data_type.unwrap_or_default(),
            serving_size: DEFAULT_SERVING_GRAMS,
            serving_unit: "g".to_string(),
        },
        nutrients,
    }
}

/// Share of words two descriptions have in common, from 0.0 to 1.0.
pub fn string_similarity(s1: &str, s2: &str) -> f64 {
    let s1_lower = s1.to_lowercase().replace(',', " ");
    let s2_lower = s2.to_lowercase().replace(',', " ");

    let s1_words: Vec<&str> = s1_lower.split_whitespace().collect();
    let s2_words: Vec<&str> = s2_lower.split_whitespace().collect();

    let longest = s1_words.len().max(s2_words.len());
    if longest == 0 {
        return 0.0;
    }

    let matches = s1_words.iter().filter(|w| s2_words.contains(w)).count();
    matches as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILS_JSON: &str = r#"{
        "fdcId": 171688,
        "description": "Apples, raw, with skin",
        "dataType": "SR Legacy",
        "foodNutrients": [
            {"nutrient": {"id": 1003, "name": "Protein", "unitName": "g"}, "amount": 0.26},
            {"nutrient": {"id": 1162, "name": "Vitamin C, total ascorbic acid", "unitName": "mg"}, "amount": 4.6},
            {"nutrient": {"id": 1114, "name": "Vitamin D (D2 + D3)", "unitName": "µg"}},
            {"amount": 12.0},
            {"nutrient": {"id": 1003, "name": "Protein", "unitName": "g"}, "amount": 9.9}
        ]
    }"#;

    #[test]
    fn test_record_from_details_drops_missing_amounts() {
        let details: FoodDetailsResponse = serde_json::from_str(DETAILS_JSON).unwrap();
        let record = record_from_details(details);

        assert_eq!(record.food.fdc_id, 171688);
        assert_eq!(record.food.category, "SR Legacy");
        assert_eq!(record.nutrients.len(), 2);
        assert_eq!(record.nutrients[0].nutrient.as_str(), "protein_g");
        assert_eq!(record.nutrients[0].amount, 0.26);
        assert_eq!(
            record.nutrients[1].nutrient.as_str(),
            "vitamin_c_total_ascorbic_acid_mg"
        );
    }

    #[test]
    fn test_search_response_tolerates_missing_fields() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"foods": [{"fdcId": 1, "description": "Egg"}]}"#).unwrap();
        assert_eq!(response.total_hits, 0);
        let summary: FoodSummary = response.foods.into_iter().next().unwrap().into();
        assert_eq!(summary.data_type, "");
    }

    #[test]
    fn test_string_similarity() {
        assert_eq!(string_similarity("Apples, raw", "apples raw"), 1.0);
        assert_eq!(string_similarity("Apples, raw, with skin", "apples"), 0.25);
        assert_eq!(string_similarity("", ""), 0.0);
    }

    #[test]
    fn test_client_requires_key() {
        let config = FoodConfig::default();
        assert!(matches!(UsdaClient::new(&config), Err(DashboardError::Config(_))));
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::guidelines::{NutritionalGuidelines, RdaProfile};
use crate::food::catalog::FoodCatalog;
use crate::food::models::{format_food_name, NutrientKey, Unit, GRAMS_PER_OUNCE};

/// Amounts at or below this are left out of single-food charts.
pub const SIGNIFICANT_AMOUNT: f64 = 0.1;

pub const DEFAULT_TOP_N: usize = 15;
pub const MAX_TOP_N: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientCategory {
    Vitamins,
    Minerals,
    Macronutrients,
}

impl NutrientCategory {
    pub const ALL: [NutrientCategory; 3] = [Self::Vitamins, Self::Minerals, Self::Macronutrients];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Vitamins => &["vitamin", "folate", "thiamin", "riboflavin", "niacin"],
            Self::Minerals => &[
                "calcium",
                "iron",
                "magnesium",
                "phosphorus",
                "potassium",
                "sodium",
                "zinc",
                "copper",
                "selenium",
            ],
            Self::Macronutrients => &["protein", "fat", "carbohydrate", "fiber", "sugar", "energy"],
        }
    }

    pub fn contains(&self, nutrient: &NutrientKey) -> bool {
        let key = nutrient.as_str();
        self.keywords().iter().any(|k| key.contains(k))
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Vitamins => "Vitamin",
            Self::Minerals => "Mineral",
            Self::Macronutrients => "Macronutrient",
        }
    }
}

/// One nutrient of one food, ready for a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientDatum {
    pub nutrient: NutrientKey,
    pub nutrient_display: String,
    pub amount: f64,
    pub unit: Unit,
}

/// Significant nutrients of a food in one category, largest amount first.
pub fn food_nutrients(
    catalog: &FoodCatalog,
    fdc_id: u64,
    category: Option<NutrientCategory>,
) -> Vec<NutrientDatum> {
    let mut data: Vec<NutrientDatum> = catalog
        .nutrients_of(fdc_id)
        .filter(|a| a.amount > SIGNIFICANT_AMOUNT)
        .filter(|a| category.map_or(true, |c| c.contains(&a.nutrient)))
        .map(|a| NutrientDatum {
            nutrient: a.nutrient.clone(),
            nutrient_display: a.nutrient.display_name(),
            amount: a.amount,
            unit: a.unit.clone(),
        })
        .collect();
    data.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    data
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFood {
    pub fdc_id: u64,
    pub description: String,
    pub amount_per_100g: f64,
    pub amount_per_ounce: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientRanking {
    pub nutrient: NutrientKey,
    pub unit: Unit,
    /// Foods reporting a positive amount, before `top_n` is applied.
    pub available: usize,
    pub foods: Vec<RankedFood>,
}

/// Foods with the most of `nutrient` per ounce.
pub fn top_foods_for_nutrient(catalog: &FoodCatalog, nutrient: &NutrientKey, top_n: usize) -> NutrientRanking {
    let mut unit = None;
    let mut foods: Vec<RankedFood> = catalog
        .foods()
        .into_iter()
        .filter_map(|food| {
            let amount = catalog.amount(food.fdc_id, nutrient)?;
            if amount.amount <= 0.0 || food.serving_size <= 0.0 {
                return None;
            }
            unit.get_or_insert_with(|| amount.unit.clone());
            Some(RankedFood {
                fdc_id: food.fdc_id,
                description: format_food_name(&food.description),
                amount_per_100g: amount.amount,
                amount_per_ounce: amount.amount * GRAMS_PER_OUNCE / food.serving_size,
            })
        })
        .collect();

    foods.sort_by(|a, b| b.amount_per_ounce.total_cmp(&a.amount_per_ounce));
    let available = foods.len();
    foods.truncate(top_n);

    NutrientRanking {
        nutrient: nutrient.clone(),
        unit: unit.unwrap_or_else(|| Unit::Other(String::new())),
        available,
        foods,
    }
}

/// One food in a meal, by catalog name and weight in grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
    pub food: String,
    pub amount_g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStatus {
    BelowMinimum,
    AboveMaximum,
    Adequate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub nutrient: NutrientKey,
    pub nutrient_display: String,
    pub total_amount: f64,
    pub unit: Unit,
    pub daily_value_pct: Option<f64>,
    pub rda: Option<f64>,
    pub upper_limit: Option<f64>,
    pub status: Option<IntakeStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealProfile {
    pub profile: RdaProfile,
    pub matched_foods: Vec<String>,
    pub unmatched_foods: Vec<String>,
    pub nutrients: Vec<ProfileEntry>,
}

/// Totals nutrients over a meal, scaled from each food's serving size to the
/// eaten weight, and checks them against the daily guidelines.
pub fn meal_profile(
    catalog: &FoodCatalog,
    guidelines: &NutritionalGuidelines,
    profile: RdaProfile,
    items: &[MealItem],
) -> MealProfile {
    let mut totals: BTreeMap<NutrientKey, (f64, Unit)> = BTreeMap::new();
    let mut matched_foods = Vec::new();
    let mut unmatched_foods = Vec::new();

    for item in items {
        let Some(food) = catalog.find_foods(&item.food).into_iter().next() else {
            unmatched_foods.push(item.food.clone());
            continue;
        };
        if food.serving_size <= 0.0 {
            unmatched_foods.push(item.food.clone());
            continue;
        }
        matched_foods.push(food.description.clone());

        let scale = item.amount_g / food.serving_size;
        for amount in catalog.nutrients_of(food.fdc_id) {
            let entry = totals
                .entry(amount.nutrient.clone())
                .or_insert((0.0, amount.unit.clone()));
            entry.0 += amount.amount * scale;
        }
    }

    let nutrients = totals
        .into_iter()
        .map(|(nutrient, (total_amount, unit))| {
            let requirement = guidelines
                .match_nutrient_key(nutrient.as_str())
                .and_then(|key| guidelines.requirement(key, profile));
            let rda = requirement.as_ref().and_then(|r| r.rda);
            let upper_limit = requirement.as_ref().and_then(|r| r.upper_limit);
            let status = requirement
                .as_ref()
                .map(|_| intake_status(total_amount, rda, upper_limit));

            ProfileEntry {
                nutrient_display: nutrient.display_name(),
                nutrient,
                total_amount,
                unit,
                daily_value_pct: rda.filter(|r| *r > 0.0).map(|r| total_amount / r * 100.0),
                rda,
                upper_limit,
                status,
            }
        })
        .collect();

    MealProfile {
        profile,
        matched_foods,
        unmatched_foods,
        nutrients,
    }
}

pub fn intake_status(amount: f64, rda: Option<f64>, upper_limit: Option<f64>) -> IntakeStatus {
    match (rda, upper_limit) {
        (Some(min), _) if amount < min => IntakeStatus::BelowMinimum,
        (_, Some(max)) if amount > max => IntakeStatus::AboveMaximum,
        _ => IntakeStatus::Adequate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::api::mock::{record, sample_records};

    fn catalog() -> FoodCatalog {
        FoodCatalog::from_records(sample_records())
    }

    #[test]
    fn test_food_nutrients_by_category() {
        let catalog = catalog();
        let vitamins = food_nutrients(&catalog, 168_462, Some(NutrientCategory::Vitamins));
        assert!(vitamins.iter().all(|d| NutrientCategory::Vitamins.contains(&d.nutrient)));
        assert_eq!(vitamins[0].nutrient.as_str(), "vitamin_k_(phylloquinone)_ug");

        let minerals = food_nutrients(&catalog, 168_462, Some(NutrientCategory::Minerals));
        assert_eq!(minerals.len(), 3);
    }

    #[test]
    fn test_food_nutrients_drops_insignificant() {
        let data = food_nutrients(&catalog(), 171_688, None);
        assert!(data.iter().all(|d| d.amount > SIGNIFICANT_AMOUNT));
        assert!(data.windows(2).all(|w| w[0].amount >= w[1].amount));
    }

    #[test]
    fn test_top_foods_per_ounce() {
        let key = NutrientKey::from_raw("potassium_k_mg");
        let ranking = top_foods_for_nutrient(&catalog(), &key, 1);

        assert_eq!(ranking.available, 2);
        assert_eq!(ranking.foods.len(), 1);
        assert_eq!(ranking.foods[0].fdc_id, 173_944);
        assert!((ranking.foods[0].amount_per_ounce - 358.0 * 0.2835).abs() < 1e-9);
        assert_eq!(ranking.unit, Unit::Mg);
    }

    #[test]
    fn test_meal_profile_scales_and_checks() {
        let items = vec![
            MealItem { food: "Bananas, raw".to_string(), amount_g: 200.0 },
            MealItem { food: "spinach".to_string(), amount_g: 50.0 },
            MealItem { food: "durian".to_string(), amount_g: 100.0 },
        ];
        let profile = meal_profile(
            &catalog(),
            &NutritionalGuidelines::new(),
            RdaProfile::Average,
            &items,
        );

        assert_eq!(profile.unmatched_foods, vec!["durian".to_string()]);
        let potassium = profile
            .nutrients
            .iter()
            .find(|e| e.nutrient.as_str() == "potassium_k_mg")
            .unwrap();
        assert!((potassium.total_amount - 716.0).abs() < 1e-9);
        assert_eq!(potassium.rda, Some(3000.0));
        assert_eq!(potassium.status, Some(IntakeStatus::BelowMinimum));

        let energy = profile
            .nutrients
            .iter()
            .find(|e| e.nutrient.as_str() == "energy_kcal")
            .unwrap();
        assert_eq!(energy.status, None);
    }

    #[test]
    fn test_meal_profile_flags_saturated_fat_limit() {
        let catalog = FoodCatalog::from_records(vec![record(
            173_430,
            "Butter, salted",
            &[("Fatty acids, total saturated", "G", 51.368)],
        )]);
        let items = vec![MealItem { food: "Butter, salted".to_string(), amount_g: 50.0 }];
        let profile = meal_profile(&catalog, &NutritionalGuidelines::new(), RdaProfile::Average, &items);

        let fat = profile
            .nutrients
            .iter()
            .find(|e| e.nutrient.as_str() == "fatty_acids_total_saturated_g")
            .unwrap();
        assert!((fat.total_amount - 25.684).abs() < 1e-9);
        assert_eq!(fat.upper_limit, Some(20.0));
        assert_eq!(fat.status, Some(IntakeStatus::AboveMaximum));
    }

    #[test]
    fn test_intake_status() {
        assert_eq!(intake_status(5.0, Some(10.0), Some(20.0)), IntakeStatus::BelowMinimum);
        assert_eq!(intake_status(25.0, Some(10.0), Some(20.0)), IntakeStatus::AboveMaximum);
        assert_eq!(intake_status(15.0, Some(10.0), Some(20.0)), IntakeStatus::Adequate);
        assert_eq!(intake_status(400.0, None, Some(300.0)), IntakeStatus::AboveMaximum);
    }
}

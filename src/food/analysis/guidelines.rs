//! Dietary Reference Intakes for adults aged 19 to 70, from NIH/USDA RDA tables.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Which RDA column to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RdaProfile {
    Male,
    Female,
    #[default]
    Average,
}

impl FromStr for RdaProfile {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "average" => Ok(Self::Average),
            other => Err(DashboardError::invalid_input(format!(
                "Unknown RDA profile '{}', expected male, female or average",
                other
            ))),
        }
    }
}

impl fmt::Display for RdaProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Average => "average",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientRequirement {
    pub name: &'static str,
    pub unit: &'static str,
    pub rda_male: Option<f64>,
    pub rda_female: Option<f64>,
    pub upper_limit: Option<f64>,
}

/// A requirement resolved for one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRequirement {
    pub key: &'static str,
    pub nutrient: &'static str,
    pub rda: Option<f64>,
    pub upper_limit: Option<f64>,
    pub unit: &'static str,
    pub rda_male: Option<f64>,
    pub rda_female: Option<f64>,
}

const fn req(
    name: &'static str,
    unit: &'static str,
    rda_male: Option<f64>,
    rda_female: Option<f64>,
    upper_limit: Option<f64>,
) -> NutrientRequirement {
    NutrientRequirement {
        name,
        unit,
        rda_male,
        rda_female,
        upper_limit,
    }
}

const GUIDELINES: &[(&str, NutrientRequirement)] = &[
    // fat-soluble vitamins
    ("vitamin_a_ug", req("Vitamin A", "µg", Some(900.0), Some(700.0), Some(3000.0))),
    ("vitamin_d_ug", req("Vitamin D", "µg", Some(15.0), Some(15.0), Some(100.0))),
    ("vitamin_e_mg", req("Vitamin E", "mg", Some(15.0), Some(15.0), Some(1000.0))),
    ("vitamin_k_ug", req("Vitamin K", "µg", Some(120.0), Some(90.0), None)),
    // water-soluble vitamins
    ("vitamin_c_mg", req("Vitamin C", "mg", Some(90.0), Some(75.0), Some(2000.0))),
    ("thiamin_mg", req("Thiamin (B1)", "mg", Some(1.2), Some(1.1), None)),
    ("riboflavin_mg", req("Riboflavin (B2)", "mg", Some(1.3), Some(1.1), None)),
    ("niacin_mg", req("Niacin (B3)", "mg", Some(16.0), Some(14.0), Some(35.0))),
    ("vitamin_b6_mg", req("Vitamin B6", "mg", Some(1.3), Some(1.3), Some(100.0))),
    ("folate_ug", req("Folate", "µg", Some(400.0), Some(400.0), Some(1000.0))),
    ("vitamin_b12_ug", req("Vitamin B12", "µg", Some(2.4), Some(2.4), None)),
    // minerals
    ("calcium_mg", req("Calcium", "mg", Some(1000.0), Some(1000.0), Some(2500.0))),
    ("iron_mg", req("Iron", "mg", Some(8.0), Some(18.0), Some(45.0))),
    ("magnesium_mg", req("Magnesium", "mg", Some(400.0), Some(310.0), Some(350.0))),
    ("phosphorus_mg", req("Phosphorus", "mg", Some(700.0), Some(700.0), Some(4000.0))),
    ("potassium_mg", req("Potassium", "mg", Some(3400.0), Some(2600.0), None)),
    ("sodium_mg", req("Sodium", "mg", Some(1500.0), Some(1500.0), Some(2300.0))),
    ("zinc_mg", req("Zinc", "mg", Some(11.0), Some(8.0), Some(40.0))),
    ("copper_mg", req("Copper", "mg", Some(0.9), Some(0.9), Some(10.0))),
    ("selenium_ug", req("Selenium", "µg", Some(55.0), Some(55.0), Some(400.0))),
    ("manganese_mg", req("Manganese", "mg", Some(2.3), Some(1.8), Some(11.0))),
    ("chromium_ug", req("Chromium", "µg", Some(35.0), Some(25.0), None)),
    ("molybdenum_ug", req("Molybdenum", "µg", Some(45.0), Some(45.0), Some(2000.0))),
    ("iodine_ug", req("Iodine", "µg", Some(150.0), Some(150.0), Some(1100.0))),
    // macronutrients
    ("protein_g", req("Protein", "g", Some(56.0), Some(46.0), None)),
    ("fiber_g", req("Dietary Fiber", "g", Some(38.0), Some(25.0), None)),
    // limits only
    ("saturated_fat_g", req("Saturated Fat", "g", None, None, Some(20.0))),
    ("cholesterol_mg", req("Cholesterol", "mg", None, None, Some(300.0))),
    ("sugars_g", req("Added Sugars", "g", None, None, Some(50.0))),
];

/// FDC nutrient keys whose names do not start with the guideline name.
const FDC_ALIASES: &[(&str, &str)] = &[
    ("fatty_acids_total_saturated_g", "saturated_fat_g"),
];

#[derive(Debug, Clone, Default)]
pub struct NutritionalGuidelines;

impl NutritionalGuidelines {
    pub fn new() -> Self {
        Self
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        GUIDELINES.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        GUIDELINES.len()
    }

    pub fn is_empty(&self) -> bool {
        GUIDELINES.is_empty()
    }

    fn raw(&self, key: &str) -> Option<(&'static str, &'static NutrientRequirement)> {
        GUIDELINES.iter().find(|(k, _)| *k == key).map(|(k, r)| (*k, r))
    }

    /// The requirement for `key` under `profile`. For `Average`, or when the
    /// profile's own column is empty, the mean of both columns is used, falling
    /// back to whichever one exists.
    pub fn requirement(&self, key: &str, profile: RdaProfile) -> Option<ResolvedRequirement> {
        let (key, req) = self.raw(key)?;

        let rda = match (profile, req.rda_male, req.rda_female) {
            (RdaProfile::Male, Some(male), _) => Some(male),
            (RdaProfile::Female, _, Some(female)) => Some(female),
            (_, Some(male), Some(female)) => Some((male + female) / 2.0),
            (_, male, female) => male.or(female),
        };

        Some(ResolvedRequirement {
            key,
            nutrient: req.name,
            rda,
            upper_limit: req.upper_limit,
            unit: req.unit,
            rda_male: req.rda_male,
            rda_female: req.rda_female,
        })
    }

    pub fn all_requirements(&self, profile: RdaProfile) -> Vec<ResolvedRequirement> {
        self.keys()
            .filter_map(|k| self.requirement(k, profile))
            .collect()
    }

    /// Maps a catalog nutrient key onto a guideline key.
    ///
    /// Keys match when their unit suffixes agree and the catalog name, with
    /// underscores removed, starts with the guideline name: `iron_fe_mg`
    /// matches `iron_mg`, `vitamin_b_6_mg` matches `vitamin_b6_mg`. FDC names
    /// that break the pattern, like saturated fat, go through an alias table.
    pub fn match_nutrient_key(&self, nutrient: &str) -> Option<&'static str> {
        if let Some((key, _)) = self.raw(nutrient) {
            return Some(key);
        }

        let lower = nutrient.to_lowercase();
        if let Some((_, key)) = FDC_ALIASES.iter().find(|(alias, _)| *alias == lower) {
            return Some(*key);
        }

        let (name, unit) = lower.rsplit_once('_')?;
        let squashed = name.replace('_', "");
        self.keys().find(|key| match key.rsplit_once('_') {
            Some((key_name, key_unit)) => {
                key_unit == unit && squashed.starts_with(&key_name.replace('_', ""))
            }
            None => false,
        })
    }

    /// The raw table keyed by guideline key, for export.
    pub fn to_json(&self) -> serde_json::Value {
        let table: BTreeMap<&str, &NutrientRequirement> =
            GUIDELINES.iter().map(|(k, r)| (*k, r)).collect();
        serde_json::json!(table)
    }
}

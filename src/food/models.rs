use std::fmt;

use serde::{Deserialize, Serialize};

/// Grams in one avoirdupois ounce.
pub const GRAMS_PER_OUNCE: f64 = 28.35;

/// Reference amount FDC reports nutrient values against.
pub const DEFAULT_SERVING_GRAMS: f64 = 100.0;

/// Canonical measurement unit for a nutrient amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Mg,
    Ug,
    Kcal,
    Kj,
    Iu,
    Other(String),
}

impl Unit {
    /// Parses the unit spellings the API uses ("MG", "UG", "µg", "kJ", ...).
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "g" => Unit::G,
            "mg" => Unit::Mg,
            "ug" | "µg" | "μg" | "mcg" => Unit::Ug,
            "kcal" => Unit::Kcal,
            "kj" => Unit::Kj,
            "iu" => Unit::Iu,
            _ => Unit::Other(lower),
        }
    }

    /// Suffix used in nutrient keys.
    pub fn suffix(&self) -> &str {
        match self {
            Unit::G => "g",
            Unit::Mg => "mg",
            Unit::Ug => "ug",
            Unit::Kcal => "kcal",
            Unit::Kj => "kj",
            Unit::Iu => "iu",
            Unit::Other(s) => s.as_str(),
        }
    }

    fn grams_factor(&self) -> Option<f64> {
        match self {
            Unit::G => Some(1.0),
            Unit::Mg => Some(1e-3),
            Unit::Ug => Some(1e-6),
            _ => None,
        }
    }

    pub fn is_mass(&self) -> bool {
        self.grams_factor().is_some()
    }

    /// Converts `amount` from `self` into `target`. Only mass units convert.
    pub fn convert(&self, amount: f64, target: &Unit) -> Option<f64> {
        if self == target {
            return Some(amount);
        }
        let from = self.grams_factor()?;
        let to = target.grams_factor()?;
        Some(amount * from / to)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Ug => write!(f, "µg"),
            Unit::Kj => write!(f, "kJ"),
            Unit::Iu => write!(f, "IU"),
            other => write!(f, "{}", other.suffix()),
        }
    }
}

/// Normalized nutrient identifier, e.g. `vitamin_c_total_ascorbic_acid_mg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientKey(String);

impl NutrientKey {
    pub fn new(name: &str, unit: &Unit) -> Self {
        let base = name
            .replace(',', "")
            .to_lowercase()
            .replace([' ', '-'], "_");
        Self(format!("{}_{}", base, unit.suffix()))
    }

    /// Wraps an already-normalized key, e.g. one coming from a query string.
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First segment of the key ("vitamin" for `vitamin_c_mg`).
    pub fn base(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }

    pub fn display_name(&self) -> String {
        format_nutrient_name(&self.0)
    }

    /// Display name with the key's own unit swapped for `unit`, used once
    /// amounts have been converted.
    pub fn display_name_in(&self, unit: &Unit) -> String {
        let name = self.0.rsplit_once('_').map_or(self.0.as_str(), |(name, _)| name);
        format!("{} ({})", title_case(&name.replace('_', " ")), unit.suffix().to_uppercase())
    }
}

impl fmt::Display for NutrientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub fdc_id: u64,
    pub description: String,
    /// FDC data type, e.g. "Foundation" or "SR Legacy".
    pub category: String,
    pub serving_size: f64,
    pub serving_unit: String,
}

impl Food {
    pub fn display_name(&self) -> String {
        format_food_name(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientAmount {
    pub fdc_id: u64,
    pub nutrient: NutrientKey,
    pub amount: f64,
    pub unit: Unit,
}

/// Food plus every nutrient amount the API reported for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub food: Food,
    pub nutrients: Vec<NutrientAmount>,
}

/// `"Apples, raw, with skin"` becomes `"Apples (Raw, With Skin)"`.
pub fn format_food_name(name: &str) -> String {
    match name.split_once(',') {
        Some((main, descriptor)) => format!(
            "{} ({})",
            title_case(main.trim()),
            title_case(descriptor.trim())
        ),
        None => title_case(name),
    }
}

/// `vitamin_e_mg` becomes `"Vitamin E (MG)"`.
pub fn format_nutrient_name(key: &str) -> String {
    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() < 2 {
        return title_case(key);
    }
    let unit = parts[parts.len() - 1].to_uppercase();
    let name = title_case(&parts[..parts.len() - 1].join(" "));
    format!("{} ({})", name, unit)
}

/// Uppercases the first letter of every alphabetic run, lowercases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

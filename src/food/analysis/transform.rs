//! Reshapes catalog records into rectangular comparison tables.
//!
//! A table has one of two pivots. `ByNutrient` puts foods on the rows and the
//! selected nutrients on the columns ("nutrient across foods"); `ByFood` puts
//! nutrients on the rows and foods on the columns ("food across nutrients").
//! Cells are `None` where the API reported no value. Rows and columns with no
//! reported value at all are dropped; nothing is imputed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::food::catalog::FoodCatalog;
use crate::food::models::{format_food_name, NutrientKey, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pivot {
    #[default]
    ByNutrient,
    ByFood,
}

/// Foods and nutrients picked in the dashboard widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub foods: Vec<u64>,
    pub nutrients: Vec<NutrientKey>,
}

impl Selection {
    pub fn new(foods: Vec<u64>, nutrients: Vec<NutrientKey>) -> Self {
        Self { foods, nutrients }
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty() || self.nutrients.is_empty()
    }

    /// Selection order with repeats removed.
    fn unique_foods(&self) -> Vec<u64> {
        let mut seen = BTreeSet::new();
        self.foods.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    fn unique_nutrients(&self) -> Vec<NutrientKey> {
        let mut seen = BTreeSet::new();
        self.nutrients
            .iter()
            .filter(|k| seen.insert((*k).clone()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Header {
    Food { fdc_id: u64, label: String },
    Nutrient { key: NutrientKey, label: String, unit: Unit },
}

impl Header {
    pub fn label(&self) -> &str {
        match self {
            Header::Food { label, .. } | Header::Nutrient { label, .. } => label,
        }
    }
}

/// One (food, nutrient, amount) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub fdc_id: u64,
    pub nutrient: NutrientKey,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub pivot: Pivot,
    pub rows: Vec<Header>,
    pub columns: Vec<Header>,
    /// `cells[row][column]`
    pub cells: Vec<Vec<Option<f64>>>,
}

impl ComparisonTable {
    pub fn empty(pivot: Pivot) -> Self {
        Self {
            pivot,
            rows: Vec::new(),
            columns: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<f64> {
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// Swaps rows and columns, turning one pivot into the other.
    pub fn transpose(&self) -> Self {
        let pivot = match self.pivot {
            Pivot::ByNutrient => Pivot::ByFood,
            Pivot::ByFood => Pivot::ByNutrient,
        };
        let cells = (0..self.columns.len())
            .map(|c| (0..self.rows.len()).map(|r| self.cell(r, c)).collect())
            .collect();

        Self {
            pivot,
            rows: self.columns.clone(),
            columns: self.rows.clone(),
            cells,
        }
    }

    /// Flattens the table back into its non-missing triples.
    pub fn observations(&self) -> Vec<Observation> {
        let mut out = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, column) in self.columns.iter().enumerate() {
                let Some(amount) = self.cell(r, c) else {
                    continue;
                };
                let (fdc_id, nutrient) = match (row, column) {
                    (Header::Food { fdc_id, .. }, Header::Nutrient { key, .. })
                    | (Header::Nutrient { key, .. }, Header::Food { fdc_id, .. }) => {
                        (*fdc_id, key.clone())
                    }
                    _ => continue,
                };
                out.push(Observation {
                    fdc_id,
                    nutrient,
                    amount,
                });
            }
        }
        out
    }

    /// Converts every mass-unit nutrient to `target`, updating the header
    /// units. Energy, IU and unknown units are left as reported.
    pub fn normalize_to(&mut self, target: &Unit) {
        if !target.is_mass() {
            return;
        }
        let rows_are_nutrients = self.pivot == Pivot::ByFood;
        let headers = if rows_are_nutrients {
            &mut self.rows
        } else {
            &mut self.columns
        };

        for (i, header) in headers.iter_mut().enumerate() {
            let Header::Nutrient { key, label, unit } = header else {
                continue;
            };
            if !unit.is_mass() || unit == target {
                continue;
            }
            let from = unit.clone();
            *unit = target.clone();
            *label = key.display_name_in(target);

            if rows_are_nutrients {
                for cell in self.cells[i].iter_mut() {
                    *cell = cell.and_then(|v| from.convert(v, target));
                }
            } else {
                for row in self.cells.iter_mut() {
                    row[i] = row[i].and_then(|v| from.convert(v, target));
                }
            }
        }
    }
}

/// "Nutrient across foods": one row per selected food, one column per
/// selected nutrient.
pub fn by_nutrient(catalog: &FoodCatalog, selection: &Selection) -> ComparisonTable {
    if selection.is_empty() {
        return ComparisonTable::empty(Pivot::ByNutrient);
    }

    let foods: Vec<u64> = selection
        .unique_foods()
        .into_iter()
        .filter(|id| catalog.contains(*id))
        .collect();
    let nutrients = selection.unique_nutrients();

    let grid: Vec<Vec<Option<f64>>> = foods
        .iter()
        .map(|&id| {
            nutrients
                .iter()
                .map(|key| catalog.amount(id, key).map(|a| a.amount))
                .collect()
        })
        .collect();

    let keep_rows: Vec<usize> = (0..foods.len())
        .filter(|&r| grid[r].iter().any(Option::is_some))
        .collect();
    let keep_cols: Vec<usize> = (0..nutrients.len())
        .filter(|&c| keep_rows.iter().any(|&r| grid[r][c].is_some()))
        .collect();

    let mut rows: Vec<Header> = keep_rows
        .iter()
        .map(|&r| food_header(catalog, foods[r]))
        .collect();
    disambiguate_food_labels(&mut rows);
    let columns = keep_cols
        .iter()
        .map(|&c| nutrient_header(catalog, &foods, &nutrients[c]))
        .collect();
    let cells = keep_rows
        .iter()
        .map(|&r| keep_cols.iter().map(|&c| grid[r][c]).collect())
        .collect();

    ComparisonTable {
        pivot: Pivot::ByNutrient,
        rows,
        columns,
        cells,
    }
}

/// "Food across nutrients": one row per selected nutrient, one column per
/// selected food.
pub fn by_food(catalog: &FoodCatalog, selection: &Selection) -> ComparisonTable {
    if selection.is_empty() {
        return ComparisonTable::empty(Pivot::ByFood);
    }
    by_nutrient(catalog, selection).transpose()
}

/// Nutrients a food reports, in key order, as a single-food selection.
pub fn all_nutrients_of(catalog: &FoodCatalog, fdc_id: u64) -> Selection {
    Selection::new(
        vec![fdc_id],
        catalog.nutrients_of(fdc_id).map(|a| a.nutrient.clone()).collect(),
    )
}

fn food_header(catalog: &FoodCatalog, fdc_id: u64) -> Header {
    let label = catalog
        .food(fdc_id)
        .map(|f| format_food_name(&f.description))
        .unwrap_or_else(|| fdc_id.to_string());
    Header::Food { fdc_id, label }
}

/// Foods whose descriptions differ only in case share a display label; those
/// get their FDC id appended so charts keep them apart.
fn disambiguate_food_labels(rows: &mut [Header]) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows.iter() {
        *counts.entry(row.label().to_string()).or_default() += 1;
    }
    for row in rows.iter_mut() {
        if let Header::Food { fdc_id, label } = row {
            if counts.get(label.as_str()).copied().unwrap_or(0) > 1 {
                *label = format!("{} #{}", label, fdc_id);
            }
        }
    }
}

fn nutrient_header(catalog: &FoodCatalog, foods: &[u64], key: &NutrientKey) -> Header {
    let unit = foods
        .iter()
        .find_map(|&id| catalog.amount(id, key))
        .map(|a| a.unit.clone())
        .unwrap_or_else(|| Unit::Other(String::new()));
    Header::Nutrient {
        key: key.clone(),
        label: key.display_name(),
        unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::api::mock::{record, sample_records};

    const APPLE: u64 = 171_688;
    const BANANA: u64 = 173_944;
    const CHICKEN: u64 = 171_477;

    fn catalog() -> FoodCatalog {
        FoodCatalog::from_records(sample_records())
    }

    fn key(raw: &str) -> NutrientKey {
        NutrientKey::from_raw(raw)
    }

    fn sorted(mut obs: Vec<Observation>) -> Vec<(u64, String, u64)> {
        let mut out: Vec<_> = obs
            .drain(..)
            .map(|o| (o.fdc_id, o.nutrient.to_string(), o.amount.to_bits()))
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_by_nutrient_rows_are_foods_with_values() {
        let selection = Selection::new(
            vec![APPLE, BANANA, CHICKEN],
            vec![key("vitamin_c_total_ascorbic_acid_mg")],
        );
        let table = by_nutrient(&catalog(), &selection);

        // Chicken reports no vitamin C, so only two rows survive.
        assert_eq!(table.pivot, Pivot::ByNutrient);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.cell(1, 0), Some(8.7));
    }

    #[test]
    fn test_by_food_rows_are_nutrients_with_values() {
        let selection = Selection::new(
            vec![CHICKEN],
            vec![key("protein_g"), key("fiber_total_dietary_g"), key("iron_fe_mg")],
        );
        let table = by_food(&catalog(), &selection);

        assert_eq!(table.pivot, Pivot::ByFood);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].label(), "Protein (G)");
        assert_eq!(table.columns.len(), 1);
    }

    #[test]
    fn test_empty_selection_yields_empty_table() {
        let catalog = catalog();
        let no_foods = Selection::new(vec![], vec![key("protein_g")]);
        let no_nutrients = Selection::new(vec![APPLE], vec![]);

        assert!(by_nutrient(&catalog, &no_foods).is_empty());
        assert!(by_food(&catalog, &no_nutrients).is_empty());
    }

    #[test]
    fn test_unknown_food_and_nutrient_are_dropped() {
        let selection = Selection::new(vec![APPLE, 1], vec![key("protein_g"), key("unobtainium_g")]);
        let table = by_nutrient(&catalog(), &selection);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.columns.len(), 1);
    }

    #[test]
    fn test_duplicate_selection_collapses() {
        let selection = Selection::new(vec![APPLE, APPLE], vec![key("protein_g"), key("protein_g")]);
        let table = by_nutrient(&catalog(), &selection);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.columns.len(), 1);
    }

    #[test]
    fn test_pivot_round_trip_preserves_triples() {
        let catalog = catalog();
        let selection = Selection::new(
            vec![APPLE, BANANA, CHICKEN, 168_462],
            catalog.available_nutrients(),
        );

        let by_nutrient = by_nutrient(&catalog, &selection);
        let by_food = by_nutrient.transpose();
        let back = by_food.transpose();

        let expected: usize = [APPLE, BANANA, CHICKEN, 168_462]
            .iter()
            .map(|&id| catalog.nutrients_of(id).count())
            .sum();
        assert_eq!(by_nutrient.observations().len(), expected);
        assert_eq!(sorted(by_nutrient.observations()), sorted(by_food.observations()));
        assert_eq!(back, by_nutrient);
    }

    #[test]
    fn test_deterministic() {
        let catalog = catalog();
        let selection = Selection::new(vec![BANANA, APPLE], vec![key("potassium_k_mg"), key("energy_kcal")]);
        assert_eq!(by_nutrient(&catalog, &selection), by_nutrient(&catalog, &selection));
    }

    #[test]
    fn test_normalize_to_converts_mass_units_only() {
        let selection = Selection::new(vec![BANANA], vec![key("potassium_k_mg"), key("energy_kcal")]);
        let mut table = by_nutrient(&catalog(), &selection);
        table.normalize_to(&Unit::G);

        assert!((table.cell(0, 0).unwrap() - 0.358).abs() < 1e-12);
        assert_eq!(table.cell(0, 1), Some(89.0));
        match &table.columns[0] {
            Header::Nutrient { unit, label, .. } => {
                assert_eq!(unit, &Unit::G);
                assert_eq!(label, "Potassium K (G)");
            }
            other => panic!("unexpected header {:?}", other),
        }
        assert_eq!(table.columns[1].label(), "Energy (KCAL)");

        let mut by_food = by_food(&catalog(), &selection);
        by_food.normalize_to(&Unit::G);
        assert!((by_food.cell(0, 0).unwrap() - 0.358).abs() < 1e-12);
        assert_eq!(by_food.rows[0].label(), "Potassium K (G)");
    }

    #[test]
    fn test_case_only_duplicates_keep_distinct_labels() {
        let catalog = FoodCatalog::from_records(vec![
            record(1, "Apples, raw", &[("Protein", "G", 0.3)]),
            record(2, "APPLES, RAW", &[("Protein", "G", 0.4)]),
        ]);
        let selection = Selection::new(vec![1, 2], vec![key("protein_g")]);
        let table = by_nutrient(&catalog, &selection);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].label(), "Apples (Raw) #1");
        assert_eq!(table.rows[1].label(), "Apples (Raw) #2");
    }
}

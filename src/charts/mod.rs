//! Vega-Lite chart specifications for the dashboard.
//!
//! Every builder returns a complete spec with inline data. Empty input gives a
//! text chart reading "No data available" instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::food::analysis::nutrition::{NutrientDatum, NutrientRanking};
use crate::food::analysis::transform::{ComparisonTable, Header, Pivot};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
pub const NO_DATA: &str = "No data available";

const WIDTH: u32 = 600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    #[default]
    Bar,
    Line,
}

pub fn empty_chart(title: &str) -> Value {
    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": title,
        "width": WIDTH,
        "height": 60,
        "data": { "values": [{}] },
        "mark": { "type": "text", "fontSize": 16 },
        "encoding": { "text": { "value": NO_DATA } }
    })
}

pub fn is_empty_chart(spec: &Value) -> bool {
    spec["mark"]["type"] == "text" && spec["encoding"]["text"]["value"] == NO_DATA
}

/// Horizontal bars of one food's nutrients, largest first.
pub fn nutrient_bar_chart(data: &[NutrientDatum], title: &str) -> Value {
    if data.is_empty() {
        return empty_chart(title);
    }

    let values: Vec<Value> = data
        .iter()
        .map(|d| {
            json!({
                "nutrient": d.nutrient,
                "nutrient_display": d.nutrient_display,
                "amount": d.amount,
                "unit": d.unit.to_string(),
            })
        })
        .collect();

    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": title,
        "width": WIDTH,
        "height": 400,
        "data": { "values": values },
        "mark": "bar",
        "params": [{ "name": "zoom", "select": "interval", "bind": "scales" }],
        "encoding": {
            "x": { "field": "amount", "type": "quantitative", "title": "Amount" },
            "y": {
                "field": "nutrient_display",
                "type": "nominal",
                "title": "Nutrient",
                "sort": { "field": "amount", "order": "descending" }
            },
            "color": {
                "field": "amount",
                "type": "quantitative",
                "scale": { "scheme": "viridis" },
                "legend": null
            },
            "tooltip": [
                { "field": "nutrient_display", "type": "nominal", "title": "Nutrient" },
                { "field": "amount", "type": "quantitative", "title": "Amount", "format": ".2f" },
                { "field": "unit", "type": "nominal", "title": "Unit" }
            ]
        }
    })
}

/// Foods ranked by amount per ounce of one nutrient.
pub fn food_ranking_chart(ranking: &NutrientRanking, nutrient_display: &str) -> Value {
    let title = format!("Top Foods for {} (per ounce)", nutrient_display);
    if ranking.foods.is_empty() {
        return empty_chart(&title);
    }

    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": title,
        "width": WIDTH,
        "height": 500,
        "data": { "values": ranking.foods },
        "mark": "bar",
        "encoding": {
            "x": { "field": "amount_per_ounce", "type": "quantitative", "title": "Amount per Ounce" },
            "y": { "field": "description", "type": "nominal", "title": "Food", "sort": "-x" },
            "color": {
                "field": "amount_per_ounce",
                "type": "quantitative",
                "scale": { "scheme": "blues" },
                "legend": null
            },
            "tooltip": [
                { "field": "description", "type": "nominal", "title": "Food" },
                { "field": "amount_per_100g", "type": "quantitative", "title": "Per 100g", "format": ".2f" },
                { "field": "amount_per_ounce", "type": "quantitative", "title": "Per Ounce", "format": ".2f" }
            ]
        }
    })
}

/// Long-format rows for a comparison table, one per non-missing cell.
pub fn table_values(table: &ComparisonTable) -> Vec<Value> {
    let mut values = Vec::new();
    for (r, row) in table.rows.iter().enumerate() {
        for (c, column) in table.columns.iter().enumerate() {
            let Some(amount) = table.cell(r, c) else {
                continue;
            };
            let (fdc_id, food, nutrient, unit) = match (row, column) {
                (Header::Food { fdc_id, label: food }, Header::Nutrient { label, unit, .. })
                | (Header::Nutrient { label, unit, .. }, Header::Food { fdc_id, label: food }) => {
                    (fdc_id, food, label, unit)
                }
                _ => continue,
            };
            values.push(json!({
                "fdc_id": fdc_id,
                "food": food,
                "nutrient": nutrient,
                "amount": amount,
                "unit": unit.to_string(),
            }));
        }
    }
    values
}

/// Grouped bars or lines comparing the selected foods and nutrients. The
/// table's row axis goes on x, its column axis on color.
pub fn comparison_chart(table: &ComparisonTable, mark: MarkKind, title: &str) -> Value {
    if table.is_empty() {
        return empty_chart(title);
    }

    let (x_field, x_title, series_field, series_title) = match table.pivot {
        Pivot::ByNutrient => ("food", "Food", "nutrient", "Nutrient"),
        Pivot::ByFood => ("nutrient", "Nutrient", "food", "Food"),
    };

    let mut encoding = json!({
        "x": { "field": x_field, "type": "nominal", "title": x_title, "sort": null },
        "y": { "field": "amount", "type": "quantitative", "title": "Amount" },
        "color": { "field": series_field, "type": "nominal", "title": series_title },
        "detail": { "field": "fdc_id", "type": "nominal" },
        "tooltip": [
            { "field": "food", "type": "nominal", "title": "Food" },
            { "field": "fdc_id", "type": "nominal", "title": "FDC ID" },
            { "field": "nutrient", "type": "nominal", "title": "Nutrient" },
            { "field": "amount", "type": "quantitative", "title": "Amount", "format": ".2f" },
            { "field": "unit", "type": "nominal", "title": "Unit" }
        ]
    });

    let mark = match mark {
        MarkKind::Bar => {
            encoding["xOffset"] = json!({ "field": series_field, "type": "nominal" });
            json!({ "type": "bar" })
        }
        MarkKind::Line => json!({ "type": "line", "point": true }),
    };

    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": title,
        "width": WIDTH,
        "height": 400,
        "data": { "values": table_values(table) },
        "mark": mark,
        "encoding": encoding
    })
}

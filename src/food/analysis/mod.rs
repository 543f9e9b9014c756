pub mod guidelines;
pub mod nutrition;
pub mod transform;

pub use guidelines::{NutritionalGuidelines, RdaProfile};
pub use transform::{by_food, by_nutrient, ComparisonTable, Pivot, Selection};

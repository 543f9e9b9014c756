use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use validator::Validate;

use crate::charts::{self, MarkKind};
use crate::error::{DashboardError, Result};
use crate::food::analysis::guidelines::ResolvedRequirement;
use crate::food::analysis::nutrition::{
    self, MealItem, MealProfile, NutrientCategory, NutrientDatum, RankedFood, DEFAULT_TOP_N,
};
use crate::food::analysis::transform::{ComparisonTable, Pivot, Selection};
use crate::food::api::FoodSummary;
use crate::food::models::{format_food_name, NutrientKey, Unit};
use crate::food::NutrientSession;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Requests served at once; reruns beyond this wait their turn.
const MAX_CONCURRENT_REQUESTS: usize = 64;

#[derive(Clone)]
pub struct AppState {
    session: Arc<NutrientSession>,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

#[derive(Serialize)]
pub struct FoodEntry {
    fdc_id: u64,
    description: String,
    display_name: String,
    category: String,
}

#[derive(Serialize)]
pub struct NutrientEntry {
    key: NutrientKey,
    display_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 1, max = 200))]
    q: String,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 200))]
    page_size: u32,
}

fn default_page_size() -> u32 {
    25
}

#[derive(Debug, Deserialize)]
pub struct FoodChartQuery {
    category: Option<NutrientCategory>,
}

#[derive(Serialize)]
pub struct FoodChartResponse {
    fdc_id: u64,
    food: String,
    category: Option<NutrientCategory>,
    data: Vec<NutrientDatum>,
    chart: Value,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RankingQuery {
    #[serde(default = "default_top_n")]
    #[validate(range(min = 1, max = 150))]
    top_n: usize,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

#[derive(Serialize)]
pub struct RankingResponse {
    nutrient: NutrientKey,
    display_name: String,
    available: usize,
    foods: Vec<RankedFood>,
    chart: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareQuery {
    /// Comma-separated FDC ids.
    foods: Option<String>,
    /// Comma-separated nutrient keys.
    nutrients: Option<String>,
    #[serde(default)]
    pivot: Pivot,
    #[serde(default)]
    mark: MarkKind,
    /// Mass unit to convert nutrient amounts into.
    unit: Option<String>,
}

#[derive(Serialize)]
pub struct CompareResponse {
    selection: Selection,
    table: ComparisonTable,
    chart: Value,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 50))]
    items: Vec<MealItem>,
}

#[derive(Serialize)]
pub struct AddFoodResponse {
    fdc_id: u64,
    added: bool,
}

impl CompareQuery {
    fn selection(&self) -> Result<Selection> {
        let foods = split_list(self.foods.as_deref())
            .map(|id| {
                id.parse::<u64>()
                    .map_err(|_| DashboardError::invalid_input(format!("'{}' is not a food id", id)))
            })
            .collect::<Result<Vec<_>>>()?;
        let nutrients = split_list(self.nutrients.as_deref())
            .map(NutrientKey::from_raw)
            .collect();
        Ok(Selection::new(foods, nutrients))
    }

    fn target_unit(&self) -> Result<Option<Unit>> {
        let Some(raw) = self.unit.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };
        let unit = Unit::parse(raw);
        if !unit.is_mass() {
            return Err(DashboardError::invalid_input(format!(
                "Cannot normalize to '{}', pick g, mg or µg",
                raw
            )));
        }
        Ok(Some(unit))
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn validate<T: Validate>(value: &T) -> Result<()> {
    value
        .validate()
        .map_err(|e| DashboardError::invalid_input(e.to_string()))
}

/// Create and configure the dashboard router
pub fn create_api(session: Arc<NutrientSession>) -> Router {
    let state = AppState { session };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/foods", get(list_foods))
        .route("/api/foods/:fdc_id", post(add_food))
        .route("/api/foods/:fdc_id/chart", get(food_chart))
        .route("/api/nutrients", get(list_nutrients))
        .route("/api/nutrients/:key/ranking", get(nutrient_ranking))
        .route("/api/search", get(search))
        .route("/api/compare", get(compare))
        .route("/api/profile", post(meal_profile))
        .route("/api/guidelines", get(guidelines))
        .layer(cors)
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
}

async fn list_foods(State(state): State<AppState>) -> Json<Vec<FoodEntry>> {
    let catalog = state.session.catalog().read().await;
    Json(
        catalog
            .foods()
            .into_iter()
            .map(|f| FoodEntry {
                fdc_id: f.fdc_id,
                description: f.description.clone(),
                display_name: format_food_name(&f.description),
                category: f.category.clone(),
            })
            .collect(),
    )
}

async fn list_nutrients(State(state): State<AppState>) -> Json<Vec<NutrientEntry>> {
    let catalog = state.session.catalog().read().await;
    Json(
        catalog
            .available_nutrients()
            .into_iter()
            .map(|key| NutrientEntry {
                display_name: key.display_name(),
                key,
            })
            .collect(),
    )
}

#[tracing::instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FoodSummary>>> {
    validate(&query)?;
    let hits = state.session.search(&query.q, query.page_size).await?;
    info!(hits = hits.len(), "search served");
    Ok(Json(hits))
}

#[tracing::instrument(skip(state))]
async fn add_food(
    State(state): State<AppState>,
    Path(fdc_id): Path<u64>,
) -> Result<Json<AddFoodResponse>> {
    let added = state.session.add_food(fdc_id).await?;
    Ok(Json(AddFoodResponse { fdc_id, added }))
}

#[tracing::instrument(skip(state))]
async fn food_chart(
    State(state): State<AppState>,
    Path(fdc_id): Path<u64>,
    Query(query): Query<FoodChartQuery>,
) -> Result<Json<FoodChartResponse>> {
    state.session.ensure_foods(&[fdc_id]).await?;

    let catalog = state.session.catalog().read().await;
    let food = catalog
        .food(fdc_id)
        .map(|f| format_food_name(&f.description))
        .ok_or_else(|| DashboardError::not_found(format!("Food with FDC ID {}", fdc_id)))?;

    let data = nutrition::food_nutrients(&catalog, fdc_id, query.category);
    let title = match query.category {
        Some(category) => format!("{} Content in {}", category.title(), food),
        None => format!("Nutrient Profile: {}", food),
    };
    let chart = charts::nutrient_bar_chart(&data, &title);

    Ok(Json(FoodChartResponse {
        fdc_id,
        food,
        category: query.category,
        data,
        chart,
    }))
}

#[tracing::instrument(skip(state))]
async fn nutrient_ranking(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<RankingResponse>> {
    validate(&query)?;
    let key = NutrientKey::from_raw(&key);
    let display_name = key.display_name();

    let catalog = state.session.catalog().read().await;
    let ranking = nutrition::top_foods_for_nutrient(&catalog, &key, query.top_n);
    let chart = charts::food_ranking_chart(&ranking, &display_name);

    Ok(Json(RankingResponse {
        nutrient: ranking.nutrient,
        display_name,
        available: ranking.available,
        foods: ranking.foods,
        chart,
    }))
}

#[tracing::instrument(skip(state))]
async fn compare(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CompareResponse>> {
    let selection = query.selection()?;
    let target_unit = query.target_unit()?;

    let mut table = state.session.compare(&selection, query.pivot).await?;
    if let Some(unit) = target_unit {
        table.normalize_to(&unit);
    }

    let title = match query.pivot {
        Pivot::ByNutrient => "Nutrients across foods",
        Pivot::ByFood => "Foods across nutrients",
    };
    let chart = charts::comparison_chart(&table, query.mark, title);
    info!(rows = table.rows.len(), columns = table.columns.len(), "comparison rendered");

    Ok(Json(CompareResponse {
        selection,
        table,
        chart,
    }))
}

#[tracing::instrument(skip(state, request))]
async fn meal_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<MealProfile>> {
    validate(&request)?;
    if let Some(bad) = request
        .items
        .iter()
        .find(|item| !item.amount_g.is_finite() || item.amount_g <= 0.0)
    {
        return Err(DashboardError::invalid_input(format!(
            "Amount for '{}' must be a positive number of grams",
            bad.food
        )));
    }

    let catalog = state.session.catalog().read().await;
    Ok(Json(nutrition::meal_profile(
        &catalog,
        state.session.guidelines(),
        state.session.profile(),
        &request.items,
    )))
}

async fn guidelines(State(state): State<AppState>) -> Json<Vec<ResolvedRequirement>> {
    let session = &state.session;
    Json(session.guidelines().all_requirements(session.profile()))
}

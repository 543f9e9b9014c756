use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use nutrient_dashboard::api::create_api;
use nutrient_dashboard::charts::is_empty_chart;
use nutrient_dashboard::food::analysis::RdaProfile;
use nutrient_dashboard::food::api::mock::sample_records;
use nutrient_dashboard::food::api::{FoodSource, MockFoodSource};
use nutrient_dashboard::food::{FoodCatalog, NutrientSession};

fn app_with(source: Arc<dyn FoodSource>, catalog: FoodCatalog) -> Router {
    let session = NutrientSession::new(source, catalog, 16, RdaProfile::Average);
    create_api(Arc::new(session))
}

fn app() -> Router {
    app_with(
        Arc::new(MockFoodSource::new()),
        FoodCatalog::from_records(sample_records()),
    )
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = get(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["status"].as_str().unwrap().contains("healthy"));
}

#[tokio::test]
async fn test_index_serves_dashboard() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("vegaEmbed"));
}

#[tokio::test]
async fn test_list_foods_and_nutrients() {
    let (status, foods) = get(app(), "/api/foods").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(foods.as_array().unwrap().len(), 4);
    assert_eq!(foods[0]["display_name"], "Apples (Raw, With Skin)");

    let (_, nutrients) = get(app(), "/api/nutrients").await;
    assert!(nutrients
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["key"] == "iron_fe_mg"));
}

#[tokio::test]
async fn test_compare_empty_selection_gives_placeholder_chart() {
    let (status, body) = get(app(), "/api/compare?foods=&nutrients=protein_g").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_empty_chart(&body["chart"]));
    assert!(body["table"]["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_compare_by_nutrient_drops_foods_without_values() {
    // Chicken has no vitamin C, so only the apple row survives.
    let uri = "/api/compare?foods=171688,171477&nutrients=vitamin_c_total_ascorbic_acid_mg";
    let (status, body) = get(app(), uri).await;
    assert_eq!(status, StatusCode::OK);

    let rows = body["table"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["fdc_id"], 171_688);
    assert_eq!(body["chart"]["data"]["values"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_compare_by_food_puts_nutrients_on_rows() {
    let uri = "/api/compare?foods=171688,173944&nutrients=protein_g,energy_kcal,iron_fe_mg&pivot=by_food&mark=line";
    let (status, body) = get(app(), uri).await;
    assert_eq!(status, StatusCode::OK);

    let table = &body["table"];
    assert_eq!(table["pivot"], "by_food");
    // Neither apple nor banana reports iron.
    assert_eq!(table["rows"].as_array().unwrap().len(), 2);
    assert_eq!(table["rows"][0]["kind"], "nutrient");
    assert_eq!(table["columns"].as_array().unwrap().len(), 2);
    assert_eq!(body["chart"]["mark"]["type"], "line");
}

#[tokio::test]
async fn test_compare_normalizes_mass_units() {
    let uri = "/api/compare?foods=171688&nutrients=vitamin_c_total_ascorbic_acid_mg&unit=ug";
    let (status, body) = get(app(), uri).await;
    assert_eq!(status, StatusCode::OK);

    let value = body["table"]["cells"][0][0].as_f64().unwrap();
    assert!((value - 4600.0).abs() < 1e-6);
    assert_eq!(body["table"]["columns"][0]["unit"], "ug");
}

#[tokio::test]
async fn test_compare_rejects_energy_as_target_unit() {
    let (status, _) = get(app(), "/api/compare?foods=171688&nutrients=protein_g&unit=kcal").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_fetch_failure_is_bad_gateway() {
    let app = app_with(Arc::new(MockFoodSource::offline()), FoodCatalog::new());
    let (status, body) = get(app, "/api/compare?foods=171688&nutrients=protein_g").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["status"].as_str().unwrap().contains("Network"));
}

#[tokio::test]
async fn test_search_validation() {
    let (status, _) = get(app(), "/api/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/api/search?q=apple&page_size=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, hits) = get(app(), "/api/search?q=banana").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["fdc_id"], 173_944);
}

#[tokio::test]
async fn test_add_food_from_search() {
    let records: Vec<_> = sample_records().into_iter().take(1).collect();
    let app = app_with(Arc::new(MockFoodSource::new()), FoodCatalog::from_records(records));

    let (status, body) = send(app.clone(), Method::POST, "/api/foods/168462", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], true);

    let (_, foods) = get(app.clone(), "/api/foods").await;
    assert_eq!(foods.as_array().unwrap().len(), 2);

    let (status, _) = send(app, Method::POST, "/api/foods/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_food_chart_by_category() {
    let (status, body) = get(app(), "/api/foods/168462/chart?category=minerals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chart"]["title"], "Mineral Content in Spinach (Raw)");
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["nutrient"] != "protein_g"));
}

#[tokio::test]
async fn test_nutrient_ranking() {
    let (status, body) = get(app(), "/api/nutrients/iron_fe_mg/ranking?top_n=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], 2);
    assert_eq!(body["foods"][0]["fdc_id"], 168_462);

    let (status, _) = get(app(), "/api/nutrients/iron_fe_mg/ranking?top_n=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_meal_profile() {
    let request = json!({
        "items": [
            { "food": "Spinach, raw", "amount_g": 200.0 },
            { "food": "dragonfruit", "amount_g": 50.0 }
        ]
    });
    let (status, body) = send(app(), Method::POST, "/api/profile", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_foods"], json!(["Spinach, raw"]));
    assert_eq!(body["unmatched_foods"], json!(["dragonfruit"]));

    let bad = json!({ "items": [{ "food": "Spinach, raw", "amount_g": -1.0 }] });
    let (status, _) = send(app(), Method::POST, "/api/profile", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guidelines_table() {
    let (status, body) = get(app(), "/api/guidelines").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["key"] == "iron_mg" && r["rda"] == 13.0));
}

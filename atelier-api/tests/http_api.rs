use atelier_api::{app, AppState};
use atelier_catalog::{CatalogStore, SizeScaler};
use atelier_core::StoredCatalog;
use atelier_quote::{PriceCache, ProductLineCatalog, QuoteService};
use atelier_store::InMemoryRepository;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const PRODUCT_LINES: &str = include_str!("../../config/product_lines.json");
const SEED_RECORDS: &str = include_str!("../../data/price_records.json");

fn build_app(seed: StoredCatalog) -> Router {
    let lines = ProductLineCatalog::from_json_str(PRODUCT_LINES)
        .unwrap()
        .compile()
        .unwrap();
    let catalog = CatalogStore::open(Arc::new(InMemoryRepository::with_catalog(seed)), 100.0).unwrap();
    let service = QuoteService::new(
        lines,
        catalog,
        SizeScaler::default(),
        PriceCache::new(chrono::Duration::minutes(15)),
    );
    app(AppState::new(service))
}

fn seeded_app() -> Router {
    build_app(serde_json::from_str(SEED_RECORDS).unwrap())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn canvas_quote(provider: &str) -> Value {
    json!({
        "product_line_id": "canvas",
        "choices": ["1.25in", "Black"],
        "width": 8,
        "height": 10,
        "quantity": 2,
        "provider": provider
    })
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&seeded_app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_quote_endpoint() {
    let app = seeded_app();
    let (status, body) = send(&app, "POST", "/v1/quotes", Some(canvas_quote("structured"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wholesale_price"], 10.99);
    assert_eq!(body["quantity"], 2);
    assert_eq!(body["provider_code"]["provider"], "structured");
    assert_eq!(body["provider_code"]["subcategory_id"], 4);
    assert_eq!(body["provider_code"]["option_ids"], json!([1, 501]));
    assert_eq!(body["pricing_path"]["kind"], "exact");
    assert_eq!(body["cached"], false);

    let (_, again) = send(&app, "POST", "/v1/quotes", Some(canvas_quote("structured"))).await;
    assert_eq!(again["cached"], true);
}

#[tokio::test]
async fn test_code_endpoints() {
    let app = seeded_app();
    let selection = json!({
        "product_line_id": "canvas",
        "choices": ["1.25 inch", "black"],
        "width": 12,
        "height": 8
    });

    let (status, body) = send(&app, "POST", "/v1/codes/token", Some(selection.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "canvas_cotton_gallery_horizontal_12_8_125_blk");

    let (status, body) = send(&app, "POST", "/v1/codes/structured", Some(selection)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subcategory_id"], 4);
    assert_eq!(body["quantity"], 1);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = seeded_app();

    let bad_choice = json!({
        "product_line_id": "canvas",
        "choices": ["1.25in", "Gold"],
        "width": 8,
        "height": 10,
        "provider": "token"
    });
    let (status, body) = send(&app, "POST", "/v1/quotes", Some(bad_choice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let unmappable = json!({
        "product_line_id": "framed_paper",
        "choices": ["Modern", "Walnut"],
        "width": 11,
        "height": 14,
        "provider": "structured"
    });
    let (status, _) = send(&app, "POST", "/v1/quotes", Some(unmappable)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let empty = build_app(StoredCatalog::default());
    let (status, body) = send(&empty, "POST", "/v1/quotes", Some(canvas_quote("token"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("8x10"));
}

#[tokio::test]
async fn test_global_markup_update() {
    let app = seeded_app();
    send(&app, "POST", "/v1/quotes", Some(canvas_quote("token"))).await;

    let (status, body) = send(&app, "PUT", "/v1/admin/markup", Some(json!({ "markup_percent": 150 }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, listing) = send(&app, "GET", "/v1/admin/price-records", None).await;
    assert_eq!(body["updated"], listing["records"].as_array().unwrap().len());
    assert_eq!(listing["global_markup_percent"], 150.0);
    assert_eq!(listing["catalog_version"], 1);

    let (_, quote) = send(&app, "POST", "/v1/quotes", Some(canvas_quote("token"))).await;
    assert_eq!(quote["cached"], false);
    assert!((quote["retail_price"].as_f64().unwrap() - 27.475).abs() < 1e-9);

    let (status, _) = send(&app, "PUT", "/v1/admin/markup", Some(json!({ "markup_percent": -5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_markup_override() {
    let app = seeded_app();
    let (status, body) = send(
        &app,
        "PUT",
        "/v1/admin/price-records/markup",
        Some(json!({
            "category": "Poster",
            "subcategory": "Matte Paper",
            "size_label": "8.5x11",
            "markup_percent": 50
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retail_price"], 3.375);

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/admin/price-records/markup",
        Some(json!({
            "category": "Poster",
            "subcategory": "Matte Paper",
            "size_label": "2x2",
            "markup_percent": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_and_cache_maintenance() {
    let app = seeded_app();
    send(&app, "POST", "/v1/quotes", Some(canvas_quote("structured"))).await;

    let (status, report) = send(
        &app,
        "POST",
        "/v1/admin/price-records/import",
        Some(json!({ "records": [
            { "category": "Metal", "subcategory": "Gloss", "size_label": "16x20",
              "width": 16, "height": 20, "wholesale_price": 41.0 },
            { "category": "Metal", "subcategory": "Gloss", "size_label": "16x0",
              "width": 16, "height": 0, "wholesale_price": 41.0 }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["inserted"], 1);
    assert_eq!(report["rejected"].as_array().unwrap().len(), 1);
    assert!(report["batch_id"].is_string());

    // The import emptied the cache
    let (_, cleared) = send(&app, "POST", "/v1/admin/cache/clear", None).await;
    assert_eq!(cleared["removed"], 0);

    send(&app, "POST", "/v1/quotes", Some(canvas_quote("structured"))).await;
    let (_, expired) = send(&app, "POST", "/v1/admin/cache/clear-expired", None).await;
    assert_eq!(expired["removed"], 0);
    let (_, cleared) = send(&app, "POST", "/v1/admin/cache/clear", None).await;
    assert_eq!(cleared["removed"], 1);
}

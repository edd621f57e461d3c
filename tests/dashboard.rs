#![cfg(feature = "web")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use profit_report::app::{AppState, router};
use profit_report::{Dataset, Record, Variant};
use std::sync::Arc;
use tower::ServiceExt;

fn dataset() -> Dataset {
    Dataset::from_records(
        Variant::Minimal,
        vec![
            Record::new("Acme Health", "1", 100.0, 150.0),
            Record::new("Acme Health", "1", 200.0, 180.0),
            Record::new("Acme Health", "2", 10.0, 5.0),
            Record::new("Blue Cross", "X", 1.0, 3.0),
        ],
    )
}

async fn get(uri: &str) -> Response {
    let app = router(Arc::new(AppState::new(dataset()).unwrap()));
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn dashboard_renders_selected_group() {
    let response = get("/?ins=Acme%20Health&class=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Data Table for Acme Health - 1"));
    assert!(html.contains("<option value=\"Blue Cross\""));
    assert!(html.contains("15.00"));
    assert!(html.contains("/chart/change-distribution?ins=Acme%20Health&class=1"));
}

#[tokio::test]
async fn dashboard_defaults_to_first_carrier_and_class() {
    let html = body_text(get("/").await).await;
    assert!(html.contains("Data Table for Acme Health - 1"));
}

#[tokio::test]
async fn empty_dataset_shows_notice() {
    let state = AppState::new(Dataset::from_records(Variant::Minimal, Vec::new())).unwrap();
    assert!(state.dataset().is_empty());
    let response = router(Arc::new(state))
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("no insurance carriers"));
}

#[tokio::test]
async fn report_endpoint_returns_json() {
    let response = get("/api/report?ins=Acme%20Health&class=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let report: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(report["summary"]["mean"], 15.0);
    assert_eq!(report["totals"]["net_profit"], 311.0);
    assert_eq!(report["rows"].as_array().unwrap().len(), 2);
    assert_eq!(report["selection"]["class"], "1");
}

#[tokio::test]
async fn carriers_and_classes_are_sorted() {
    let carriers: Vec<String> =
        serde_json::from_str(&body_text(get("/api/carriers").await).await).unwrap();
    assert_eq!(carriers, vec!["Acme Health", "Blue Cross"]);

    let classes: Vec<String> =
        serde_json::from_str(&body_text(get("/api/classes?ins=Acme%20Health").await).await)
            .unwrap();
    assert_eq!(classes, vec!["1", "2"]);
}

#[tokio::test]
async fn chart_endpoint_serves_png() {
    let response = get("/chart/profit-comparison?ins=Acme%20Health&class=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[tokio::test]
async fn unknown_chart_is_not_found() {
    let response = get("/chart/pie").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "unknown chart 'pie'");
}

#[tokio::test]
async fn extended_chart_on_minimal_data_is_not_found() {
    let response = get("/chart/profit-by-prescriber").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_downloads_csv() {
    let response = get("/api/export?ins=Blue%20Cross&class=X&format=csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");

    let csv = body_text(response).await;
    assert_eq!(
        csv.lines().collect::<Vec<_>>(),
        vec![
            "Ins,class,Net Profit,Highest Net Profit,Net Profit Change",
            "Blue Cross,X,1,3,2",
        ]
    );
}

#[tokio::test]
async fn export_rejects_unknown_format() {
    let response = get("/api/export?format=pdf").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

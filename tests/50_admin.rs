mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{ids, TestServer};

#[tokio::test]
async fn categories_reorder_by_drag() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.get("/api/categories").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"]), vec![1, 2, 3, 4]);

    let (status, body) = server.post("/api/categories/reorder", json!({ "dragged_id": 3, "target_id": 1 })).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(ids(&body["data"]), vec![3, 1, 2, 4]);
    let positions: Vec<_> = body["data"].as_array().unwrap().iter().map(|c| c["position"].clone()).collect();
    assert_eq!(positions, vec![json!(0), json!(1), json!(2), json!(3)]);

    // A cancelled gesture leaves the order alone.
    let gesture = json!({ "events": [
        { "type": "start", "id": 4 },
        { "type": "over", "target": 3 },
        { "type": "cancel" }
    ]});
    let (_, body) = server.post("/api/categories/reorder", gesture).await?;
    assert_eq!(ids(&body["data"]), vec![3, 1, 2, 4]);

    let (status, _) = server.post("/api/categories/reorder", json!({ "dragged_id": 9, "target_id": 1 })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn promo_codes_are_generated_and_listed() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.post("/api/promos", json!({ "prefix": "batch", "discount_percent": "12.5" })).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let code = body["data"]["code"].as_str().unwrap_or_default().to_string();
    assert!(code.starts_with("BATCH-"), "{}", code);
    assert_eq!(code.len(), "BATCH-".len() + 8);

    let (status, _) = server.post("/api/promos", json!({ "discount_percent": 20, "max_uses": 5 })).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = server.get("/api/promos").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, body) = server.post("/api/promos", json!({ "discount_percent": 150 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field_errors"]["discount_percent"].is_string(), true);
    Ok(())
}

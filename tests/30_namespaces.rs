mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

fn members(body: &Value) -> Vec<i64> {
    let mut ids: Vec<i64> = body["data"]
        .as_array()
        .map(|a| a.iter().filter(|i| i["in_namespace"] == true).filter_map(|i| i["id"].as_i64()).collect())
        .unwrap_or_default();
    ids.sort();
    ids
}

#[tokio::test]
async fn namespace_listing_flags_members() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (status, body) = server.get("/api/namespaces/0/ingredients").await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(6));
    assert_eq!(members(&body), vec![1, 2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn add_and_remove_are_idempotent() -> Result<()> {
    let server = TestServer::spawn().await?;

    for _ in 0..2 {
        let (status, body) = server.post("/api/namespaces/2/ingredients/6", json!({})).await?;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["namespace_mask"], 0b100);
    }
    let (_, body) = server.get("/api/namespaces/2/ingredients").await?;
    assert_eq!(members(&body), vec![6]);

    for _ in 0..2 {
        let (status, body) = server.delete("/api/namespaces/2/ingredients/6").await?;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["namespace_mask"], 0);
    }
    Ok(())
}

#[tokio::test]
async fn concurrent_adds_keep_every_bit() -> Result<()> {
    let server = std::sync::Arc::new(TestServer::spawn().await?);

    let mut handles = Vec::new();
    for bit in 0..8 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            server.post(&format!("/api/namespaces/{}/ingredients/6", bit), json!({})).await
        }));
    }
    for handle in handles {
        let (status, _) = handle.await??;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = server.get("/api/namespaces/7/ingredients").await?;
    let carrot = body["data"].as_array().unwrap().iter().find(|i| i["id"] == 6).cloned().unwrap();
    assert_eq!(carrot["namespace_mask"], 0xFF);
    Ok(())
}

#[tokio::test]
async fn rejects_out_of_range_bits_and_unknown_ingredients() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.post("/api/namespaces/31/ingredients/1", json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "RANGE_ERROR");

    let (status, body) = server.post("/api/namespaces/1/ingredients/404", json!({})).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn exclude_children_clears_descendants() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.post("/api/ingredients/1/exclude-children", json!({ "bit_indexes": [0] })).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["excluded_count"], 3);
    assert_eq!(body["data"]["excluded_ids"], json!([2, 3, 4]));
    assert_eq!(body["data"]["failures"], json!([]));

    // Only the parent stays in the pantry namespace.
    let (_, body) = server.get("/api/namespaces/0/ingredients").await?;
    assert_eq!(members(&body), vec![1]);

    let (status, body) = server.post("/api/ingredients/1/exclude-children", json!({ "bit_indexes": [40] })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "RANGE_ERROR");
    Ok(())
}

//! JSON API tests for brands, categories and products.

use reqwest::StatusCode;
use serde_json::{Value, json};

use shopdesk_integration_tests::{TestServer, id_of};

async fn create_brand(server: &TestServer, name: &str, url: &str) -> Value {
    let (status, body) = server
        .post("/api/brands", &json!({"name": name, "url": url}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn product(name: &str, sku: &str) -> Value {
    json!({
        "name": name,
        "sku": sku,
        "price": "12.5",
        "quantity": 3,
        "type": "deliverable",
    })
}

// ============================================================================
// Brands
// ============================================================================

#[tokio::test]
async fn test_brand_crud() {
    let server = TestServer::start().await;
    let brand = create_brand(&server, "Acme Co", "https://acme.test").await;
    let id = id_of(&brand);
    assert_eq!(brand["slug"], "acme-co");
    assert_eq!(brand["is_visible"], true);

    let (status, body) = server
        .put(
            &format!("/api/brands/{id}"),
            &json!({"name": "Acme Corp", "url": "https://acme.test", "is_visible": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme Corp");
    assert_eq!(body["slug"], "acme-corp");
    assert_eq!(body["is_visible"], false);

    let (status, _) = server.delete(&format!("/api/brands/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = server.get_json(&format!("/api/brands/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_brand_slug_gets_suffix() {
    let server = TestServer::start().await;
    create_brand(&server, "Acme Co", "https://one.test").await;
    let second = create_brand(&server, "Acme Co", "https://two.test").await;
    assert_eq!(second["slug"], "acme-co-2");
}

#[tokio::test]
async fn test_brand_rename_into_taken_slug_gets_suffix() {
    let server = TestServer::start().await;
    create_brand(&server, "Acme Co", "https://one.test").await;
    let other = create_brand(&server, "Globex", "https://two.test").await;
    let id = id_of(&other);

    let (status, body) = server
        .put(
            &format!("/api/brands/{id}"),
            &json!({"name": "Acme Co", "url": "https://two.test"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["slug"], "acme-co-2");

    // Saving again under the same name keeps the record's own slug.
    let (_, body) = server
        .put(
            &format!("/api/brands/{id}"),
            &json!({"name": "Acme Co", "url": "https://two.test"}),
        )
        .await;
    assert_eq!(body["slug"], "acme-co-2");
}

#[tokio::test]
async fn test_brand_validation_errors() {
    let server = TestServer::start().await;
    create_brand(&server, "Acme", "https://acme.test").await;
    let (status, body) = server
        .post(
            "/api/brands",
            &json!({"name": "", "url": "https://acme.test", "primary_hex": "blue"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["errors"]["name"][0], "The name field is required.");
    assert!(body["errors"]["primary_hex"].is_array());
}

#[tokio::test]
async fn test_brand_with_products_cannot_be_deleted() {
    let server = TestServer::start().await;
    let brand = id_of(&create_brand(&server, "Acme", "https://acme.test").await);
    let mut input = product("Shoe", "SH-1");
    input["brand_id"] = json!(brand);
    let (status, _) = server.post("/api/products", &input).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = server.delete(&format!("/api/brands/{brand}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_brand_list_search_sort_and_paging() {
    let server = TestServer::start().await;
    for (name, url) in [
        ("Zephyr", "https://zephyr.test"),
        ("Acme", "https://acme.test"),
        ("Mango", "https://mango.test"),
    ] {
        create_brand(&server, name, url).await;
    }

    let (status, body) = server
        .get_json("/api/brands?sort=name&direction=asc&per_page=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Acme", "Mango"]);

    let (_, body) = server.get_json("/api/brands?q=ZEPH").await;
    assert_eq!(body["total"], 1);

    let (status, body) = server.get_json("/api/brands?per_page=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = server.get_json("/api/brands?sort=url").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_delete_brands() {
    let server = TestServer::start().await;
    let a = id_of(&create_brand(&server, "A", "https://a.test").await);
    let b = id_of(&create_brand(&server, "B", "https://b.test").await);
    create_brand(&server, "C", "https://c.test").await;

    let (status, body) = server
        .post("/api/brands/bulk-delete", &json!({"ids": [a, b]}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);
    let (_, body) = server.get_json("/api/brands").await;
    assert_eq!(body["total"], 1);
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn test_category_parent_cycle_is_rejected() {
    let server = TestServer::start().await;
    let (_, root) = server.post("/api/categories", &json!({"name": "Root"})).await;
    let root = id_of(&root);
    let (_, child) = server
        .post("/api/categories", &json!({"name": "Child", "parent_id": root}))
        .await;
    let child = id_of(&child);

    let (status, body) = server
        .put(
            &format!("/api/categories/{root}"),
            &json!({"name": "Root", "parent_id": child}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["parent_id"].is_array());

    let (status, _) = server
        .put(
            &format!("/api/categories/{root}"),
            &json!({"name": "Root", "parent_id": root}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_category_tree_and_parent_removal() {
    let server = TestServer::start().await;
    let (_, root) = server.post("/api/categories", &json!({"name": "Root"})).await;
    let root = id_of(&root);
    let (_, child) = server
        .post("/api/categories", &json!({"name": "Child", "parent_id": root}))
        .await;
    assert_eq!(child["is_visible"], true);

    let (status, tree) = server.get_json("/api/categories/tree").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree.as_array().unwrap().len(), 1);
    assert_eq!(tree[0]["children"][0]["name"], "Child");

    let (status, _) = server.delete(&format!("/api/categories/{root}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, child) = server
        .get_json(&format!("/api/categories/{}", id_of(&child)))
        .await;
    assert!(child["parent_id"].is_null());
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_product_create_normalizes_values() {
    let server = TestServer::start().await;
    let (status, body) = server.post("/api/products", &product("Red Shoe", "RS-1")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["slug"], "red-shoe");
    assert_eq!(body["price"], "12.50");
    assert_eq!(body["is_visible"], true);
    assert_eq!(body["is_featured"], false);
    assert!(body["published_at"].is_string());
}

#[tokio::test]
async fn test_product_quantity_above_hundred() {
    let server = TestServer::start().await;
    let mut input = product("Shoe", "SH-1");
    input["quantity"] = json!(150);
    let (status, body) = server.post("/api/products", &input).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["quantity"][0],
        "The quantity field must not be greater than 100."
    );
}

#[tokio::test]
async fn test_product_sku_must_be_unique() {
    let server = TestServer::start().await;
    server.post("/api/products", &product("Shoe", "SH-1")).await;
    let (status, body) = server.post("/api/products", &product("Boot", "SH-1")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["sku"][0], "The sku has already been taken.");
}

#[tokio::test]
async fn test_product_filters_and_search() {
    let server = TestServer::start().await;
    let brand = id_of(&create_brand(&server, "Acme", "https://acme.test").await);
    let mut shoe = product("Trail Shoe", "TS-1");
    shoe["brand_id"] = json!(brand);
    shoe["description"] = json!("Grippy soles for wet rock");
    server.post("/api/products", &shoe).await;
    let mut hidden = product("Hidden Hat", "HH-1");
    hidden["is_visible"] = json!(false);
    server.post("/api/products", &hidden).await;

    let (_, body) = server.get_json("/api/products?is_visible=false").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["name"], "Hidden Hat");

    let (_, body) = server
        .get_json(&format!("/api/products?brand_id={brand}"))
        .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["brand_name"], "Acme");

    let (status, hits) = server.get_json("/api/products/search?q=wet%20rock").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["title"], "Trail Shoe");
    assert_eq!(hits[0]["details"][0], json!(["Brand", "Acme"]));

    let (_, hits) = server.get_json("/api/products/search?q=").await;
    assert_eq!(hits, json!([]));
}

#[tokio::test]
async fn test_schema_endpoint() {
    let server = TestServer::start().await;
    let (status, body) = server.get_json("/api/schema/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plural_label"], "Products");
    let (status, _) = server.get_json("/api/schema/users").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
    assert_eq!(server.get("/health/ready").await.status(), StatusCode::OK);
}

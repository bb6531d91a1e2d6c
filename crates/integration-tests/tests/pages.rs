//! Server-rendered page tests.

use reqwest::{StatusCode, header::LOCATION};
use serde_json::json;

use shopdesk_integration_tests::{TestServer, id_of};

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_home_redirects_to_products() {
    let server = TestServer::start().await;
    let response = server.get("/").await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/products");
}

#[tokio::test]
async fn test_every_table_renders() {
    let server = TestServer::start().await;
    for slug in ["products", "brands", "categories", "orders", "customers"] {
        let response = server.get(&format!("/{slug}")).await;
        assert_eq!(response.status(), StatusCode::OK, "/{slug}");
        let html = response.text().await.unwrap();
        assert!(html.contains(&format!("action=\"/{slug}/bulk-delete\"")));

        let response = server.get(&format!("/{slug}/create")).await;
        assert_eq!(response.status(), StatusCode::OK, "/{slug}/create");
    }
}

#[tokio::test]
async fn test_create_brand_through_form() {
    let server = TestServer::start().await;
    let response = server
        .submit(
            "/brands",
            &[
                ("name", "Acme Co"),
                ("url", "https://acme.test"),
                ("is_visible", "true"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.ends_with("?notice=created"), "{target}");

    let html = server.get(&target).await.text().await.unwrap();
    assert!(html.contains("Acme Co"));
    assert!(html.contains("acme-co"));
    assert!(html.contains("Created"));
}

#[tokio::test]
async fn test_invalid_form_is_rendered_again() {
    let server = TestServer::start().await;
    let response = server
        .submit(
            "/products",
            &[
                ("name", "Shoe"),
                ("sku", "SH-1"),
                ("price", "10"),
                ("quantity", "150"),
                ("type", "deliverable"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text().await.unwrap();
    assert!(html.contains("The quantity field must not be greater than 100."));
    // Submitted values are kept.
    assert!(html.contains("value=\"SH-1\""));
}

#[tokio::test]
async fn test_order_form_and_detail_page() {
    let server = TestServer::start().await;
    let (_, customer) = server
        .post(
            "/api/customers",
            &json!({"name": "Ada Lovelace", "email": "ada@example.com"}),
        )
        .await;
    let (_, product) = server
        .post(
            "/api/products",
            &json!({"name": "Shoe", "sku": "SH-1", "price": "10.00", "quantity": 5, "type": "deliverable"}),
        )
        .await;
    let customer = id_of(&customer).to_string();
    let product = id_of(&product).to_string();

    let response = server
        .submit(
            "/orders",
            &[
                ("customer_id", customer.as_str()),
                ("status", "processing"),
                ("shipping_price", "3"),
                ("items.0.id", ""),
                ("items.0.product_id", product.as_str()),
                ("items.0.quantity", "2"),
                ("items.1.id", ""),
                ("items.1.product_id", ""),
                ("items.1.quantity", ""),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let detail = location(&response);

    let html = server.get(&detail).await.text().await.unwrap();
    assert!(html.contains("RM 23.00"));
    assert!(html.contains("Shoe"));

    let list = server.get("/orders").await.text().await.unwrap();
    assert!(list.contains("Sum of total price: RM 23.00"));
}

#[tokio::test]
async fn test_order_delete_and_restore_pages() {
    let server = TestServer::start().await;
    let (_, customer) = server
        .post("/api/customers", &json!({"name": "Bo", "email": "bo@example.com"}))
        .await;
    let (_, order) = server
        .post("/api/orders", &json!({"customer_id": id_of(&customer)}))
        .await;
    let id = id_of(&order);

    let response = server.submit(&format!("/orders/{id}/delete"), &[]).await;
    assert_eq!(location(&response), "/orders?notice=deleted");

    let html = server.get(&format!("/orders/{id}")).await.text().await.unwrap();
    assert!(html.contains("Restore"));
    assert_eq!(
        server.get(&format!("/orders/{id}/edit")).await.status(),
        StatusCode::NOT_FOUND
    );

    let response = server.submit(&format!("/orders/{id}/restore"), &[]).await;
    assert_eq!(location(&response), format!("/orders/{id}?notice=restored"));
    let (_, order) = server.get_json(&format!("/api/orders/{id}")).await;
    assert!(order["deleted_at"].is_null());
}

#[tokio::test]
async fn test_bulk_delete_form() {
    let server = TestServer::start().await;
    let mut ids = Vec::new();
    for name in ["One", "Two", "Three"] {
        let (_, body) = server.post("/api/categories", &json!({"name": name})).await;
        ids.push(id_of(&body).to_string());
    }
    let pairs: Vec<(&str, &str)> = ids.iter().take(2).map(|id| ("ids[]", id.as_str())).collect();
    let response = server.submit("/categories/bulk-delete", &pairs).await;
    assert_eq!(location(&response), "/categories?notice=deleted");

    let (_, list) = server.get_json("/api/categories").await;
    assert_eq!(list["total"], 1);
}

#[tokio::test]
async fn test_table_sorting_links_and_bad_params() {
    let server = TestServer::start().await;
    let html = server
        .get("/brands?sort=name&direction=asc")
        .await
        .text()
        .await
        .unwrap();
    assert!(html.contains("direction=desc"));

    let response = server.get("/brands?per_page=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("per_page"));
}

#[tokio::test]
async fn test_missing_record_page() {
    let server = TestServer::start().await;
    let response = server.get("/products/42").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Not Found"));
}

#[tokio::test]
async fn test_search_page() {
    let server = TestServer::start().await;
    server
        .post(
            "/api/products",
            &json!({
                "name": "Trail Runner",
                "sku": "TR-1",
                "price": "80",
                "quantity": 4,
                "type": "deliverable",
                "description": "Lightweight shoe",
            }),
        )
        .await;
    let html = server.get("/search?q=lightweight").await.text().await.unwrap();
    assert!(html.contains("Trail Runner"));
    let html = server.get("/search?q=boots").await.text().await.unwrap();
    assert!(html.contains("No products match"));
}

//! JSON API tests for customers and orders.

use reqwest::StatusCode;
use serde_json::{Value, json};

use shopdesk_integration_tests::{TestServer, id_of};

struct Shop {
    server: TestServer,
    customer: i64,
    shoe: i64,
    sock: i64,
}

async fn shop() -> Shop {
    let server = TestServer::start().await;
    let (status, customer) = server
        .post(
            "/api/customers",
            &json!({"name": "Ada Lovelace", "email": "Ada@Example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{customer}");
    assert_eq!(customer["email"], "ada@example.com");

    let shoe = create_product(&server, "Shoe", "SH-1", "10.00").await;
    let sock = create_product(&server, "Sock", "SO-1", "2.50").await;

    Shop {
        customer: id_of(&customer),
        shoe,
        sock,
        server,
    }
}

async fn create_product(server: &TestServer, name: &str, sku: &str, price: &str) -> i64 {
    let (status, body) = server
        .post(
            "/api/products",
            &json!({
                "name": name,
                "sku": sku,
                "price": price,
                "quantity": 10,
                "type": "deliverable",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

impl Shop {
    async fn order(&self, items: Value, shipping: &str) -> Value {
        let (status, body) = self
            .server
            .post(
                "/api/orders",
                &json!({
                    "customer_id": self.customer,
                    "shipping_price": shipping,
                    "items": items,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

#[tokio::test]
async fn test_customer_email_is_unique() {
    let shop = shop().await;
    let (status, body) = shop
        .server
        .post(
            "/api/customers",
            &json!({"name": "Other", "email": "ADA@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");
}

#[tokio::test]
async fn test_order_total_and_number() {
    let shop = shop().await;
    let order = shop
        .order(
            json!([
                {"product_id": shop.shoe, "quantity": 2},
                {"product_id": shop.sock, "quantity": 2},
            ]),
            "3.00",
        )
        .await;
    assert_eq!(order["total_price"], "28.00");
    assert_eq!(order["status"], "pending");
    assert!(order["number"].as_str().unwrap().starts_with("OR-"));
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][0]["unit_price"], "10.00");
}

#[tokio::test]
async fn test_order_requires_known_references() {
    let shop = shop().await;
    let (status, body) = shop
        .server
        .post(
            "/api/orders",
            &json!({"customer_id": 999, "items": [{"product_id": 999}]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["customer_id"][0], "The selected customer id is invalid.");
    assert_eq!(
        body["errors"]["items.0.product_id"][0],
        "The selected product id is invalid."
    );
}

#[tokio::test]
async fn test_unit_price_is_kept_after_product_change() {
    let shop = shop().await;
    let order = shop
        .order(json!([{"product_id": shop.shoe, "quantity": 1}]), "0")
        .await;
    let id = id_of(&order);

    let (status, _) = shop
        .server
        .put(
            &format!("/api/products/{}", shop.shoe),
            &json!({
                "name": "Shoe",
                "sku": "SH-1",
                "price": "50.00",
                "quantity": 10,
                "type": "deliverable",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, order) = shop.server.get_json(&format!("/api/orders/{id}")).await;
    assert_eq!(order["items"][0]["unit_price"], "10.00");
    assert_eq!(order["total_price"], "10.00");
}

#[tokio::test]
async fn test_order_items_endpoints() {
    let shop = shop().await;
    let order = shop
        .order(json!([{"product_id": shop.shoe, "quantity": 1}]), "0")
        .await;
    let id = id_of(&order);

    let (status, order) = shop
        .server
        .post(
            &format!("/api/orders/{id}/items"),
            &json!({"product_id": shop.sock, "quantity": 4}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_price"], "20.00");

    let sock_item = order["items"][1]["id"].as_i64().unwrap();
    let (status, order) = shop
        .server
        .put(
            &format!("/api/orders/{id}/items/{sock_item}"),
            &json!({"product_id": shop.sock, "quantity": 2}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_price"], "15.00");

    let (status, order) = shop
        .server
        .delete(&format!("/api/orders/{id}/items/{sock_item}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_price"], "10.00");

    let (status, _) = shop
        .server
        .delete(&format!("/api/orders/{id}/items/{sock_item}"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_soft_delete_restore_and_force_delete() {
    let shop = shop().await;
    let order = shop
        .order(json!([{"product_id": shop.shoe, "quantity": 1}]), "0")
        .await;
    let id = id_of(&order);

    let (status, _) = shop.server.delete(&format!("/api/orders/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = shop.server.get_json("/api/orders").await;
    assert_eq!(list["total"], 0);
    let (_, list) = shop.server.get_json("/api/orders?trashed=only").await;
    assert_eq!(list["total"], 1);
    let (status, trashed) = shop.server.get_json(&format!("/api/orders/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(trashed["deleted_at"].is_string());

    let (status, restored) = shop
        .server
        .post(&format!("/api/orders/{id}/restore"), &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(restored["deleted_at"].is_null());

    let (status, _) = shop.server.delete(&format!("/api/orders/{id}/force")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = shop.server.get_json(&format!("/api/orders/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_list_sums_totals_and_filters_status() {
    let shop = shop().await;
    shop.order(json!([{"product_id": shop.shoe, "quantity": 1}]), "0")
        .await;
    let second = shop
        .order(json!([{"product_id": shop.sock, "quantity": 2}]), "1.00")
        .await;
    let (status, _) = shop
        .server
        .put(
            &format!("/api/orders/{}", id_of(&second)),
            &json!({"customer_id": shop.customer, "status": "completed", "shipping_price": "1.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = shop.server.get_json("/api/orders?per_page=1").await;
    assert_eq!(list["total"], 2);
    assert_eq!(list["items"].as_array().unwrap().len(), 1);
    assert_eq!(list["total_price_sum"], "16.00");

    let (_, list) = shop.server.get_json("/api/orders?status=completed").await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["total_price_sum"], "6.00");
}

#[tokio::test]
async fn test_product_on_order_cannot_be_deleted() {
    let shop = shop().await;
    shop.order(json!([{"product_id": shop.shoe, "quantity": 1}]), "0")
        .await;
    let (status, _) = shop
        .server
        .delete(&format!("/api/products/{}", shop.shoe))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_deleting_customer_removes_orders() {
    let shop = shop().await;
    let order = shop
        .order(json!([{"product_id": shop.shoe, "quantity": 1}]), "0")
        .await;
    let (status, _) = shop
        .server
        .delete(&format!("/api/customers/{}", shop.customer))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = shop
        .server
        .get_json(&format!("/api/orders/{}", id_of(&order)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! Cart lifecycle over HTTP.

use marketstall_integration_tests::{TestContext, json_body, product_form};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn shop() -> (TestContext, String, Value) {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    let shirt = ctx
        .create_product(&admin, product_form("Red Shirt", "19.99", "S,M,L"))
        .await;
    let shopper = ctx.register("shopper@shop.test", "hunter2hunter2").await;
    (ctx, shopper, shirt)
}

#[tokio::test]
async fn test_cart_requires_token() {
    let ctx = TestContext::new().await;
    let resp = ctx.get("/api/cart").send().await.expect("cart request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_cart() {
    let (ctx, shopper, _) = shop().await;
    let body = json_body(
        ctx.get("/api/cart")
            .bearer_auth(&shopper)
            .send()
            .await
            .expect("cart request"),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["totalItems"], 0);
    assert_eq!(body["subtotal"], "0");
    assert_eq!(body["cart"]["items"], json!([]));
}

#[tokio::test]
async fn test_add_merges_same_size() {
    let (ctx, shopper, shirt) = shop().await;

    let resp = ctx
        .post("/api/cart/add")
        .bearer_auth(&shopper)
        .json(&json!({ "productId": shirt["id"], "qty": 2, "size": "M" }))
        .send()
        .await
        .expect("add request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(
        ctx.post("/api/cart/add")
            .bearer_auth(&shopper)
            .json(&json!({ "slug": "red-shirt", "qty": "1", "size": "M" }))
            .send()
            .await
            .expect("add request"),
    )
    .await;
    assert_eq!(body["cart"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["cart"]["items"][0]["qty"], 3);
    assert_eq!(body["totalItems"], 3);
    assert_eq!(body["subtotal"], "59.97");

    let body = json_body(
        ctx.post("/api/cart/add")
            .bearer_auth(&shopper)
            .json(&json!({ "slug": "red-shirt", "size": "L" }))
            .send()
            .await
            .expect("add request"),
    )
    .await;
    assert_eq!(body["cart"]["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["totalItems"], 4);
}

#[tokio::test]
async fn test_add_rejects_bad_input() {
    let (ctx, shopper, shirt) = shop().await;

    let cases = [
        (json!({ "qty": 1 }), StatusCode::BAD_REQUEST, "productId or slug is required"),
        (json!({ "slug": "no-such-shirt" }), StatusCode::NOT_FOUND, "Product not found"),
        (json!({ "productId": 9999 }), StatusCode::NOT_FOUND, "Product not found"),
        (
            json!({ "productId": shirt["id"], "size": "XXL" }),
            StatusCode::BAD_REQUEST,
            "Invalid size selection",
        ),
    ];
    for (payload, status, message) in cases {
        let resp = ctx
            .post("/api/cart/add")
            .bearer_auth(&shopper)
            .json(&payload)
            .send()
            .await
            .expect("add request");
        assert_eq!(resp.status(), status, "{payload}");
        assert_eq!(json_body(resp).await["message"], message);
    }

    let resp = ctx
        .post("/api/cart/add")
        .bearer_auth(&shopper)
        .json(&json!({ "productId": shirt["id"], "qty": 0 }))
        .send()
        .await
        .expect("add request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let (ctx, shopper, shirt) = shop().await;

    let body = json_body(
        ctx.post("/api/cart/add")
            .bearer_auth(&shopper)
            .json(&json!({ "productId": shirt["id"], "size": "S" }))
            .send()
            .await
            .expect("add request"),
    )
    .await;
    let line = body["cart"]["items"][0]["id"]
        .as_str()
        .expect("line id")
        .to_string();

    let body = json_body(
        ctx.patch(&format!("/api/cart/item/{line}"))
            .bearer_auth(&shopper)
            .json(&json!({ "qty": 4, "size": "L" }))
            .send()
            .await
            .expect("patch request"),
    )
    .await;
    assert_eq!(body["cart"]["items"][0]["qty"], 4);
    assert_eq!(body["cart"]["items"][0]["size"], "L");
    assert_eq!(body["subtotal"], "79.96");

    for bad in [json!({ "qty": 0 }), json!({ "qty": "abc" }), json!({ "qty": 2, "size": "XXL" })] {
        let resp = ctx
            .patch(&format!("/api/cart/item/{line}"))
            .bearer_auth(&shopper)
            .json(&bad)
            .send()
            .await
            .expect("patch request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{bad}");

        let body = json_body(
            ctx.get("/api/cart")
                .bearer_auth(&shopper)
                .send()
                .await
                .expect("cart request"),
        )
        .await;
        assert_eq!(body["cart"]["items"][0]["qty"], 4, "{bad}");
        assert_eq!(body["cart"]["items"][0]["size"], "L", "{bad}");
    }

    let resp = ctx
        .patch(&format!("/api/cart/item/{line}"))
        .bearer_auth(&shopper)
        .json(&json!({ "size": "XXL" }))
        .send()
        .await
        .expect("patch request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .delete("/api/cart/item/not-a-line")
        .bearer_auth(&shopper)
        .send()
        .await
        .expect("delete request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["message"], "Item not found");

    let body = json_body(
        ctx.delete(&format!("/api/cart/item/{line}"))
            .bearer_auth(&shopper)
            .send()
            .await
            .expect("delete request"),
    )
    .await;
    assert_eq!(body["totalItems"], 0);

    ctx.post("/api/cart/add")
        .bearer_auth(&shopper)
        .json(&json!({ "slug": "red-shirt", "qty": 2 }))
        .send()
        .await
        .expect("add request");
    let body = json_body(
        ctx.post("/api/cart/clear")
            .bearer_auth(&shopper)
            .send()
            .await
            .expect("clear request"),
    )
    .await;
    assert_eq!(body["cart"]["items"], json!([]));
    assert_eq!(body["subtotal"], "0");
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let (ctx, shopper, shirt) = shop().await;
    let other = ctx.register("other@shop.test", "hunter2hunter2").await;

    ctx.post("/api/cart/add")
        .bearer_auth(&shopper)
        .json(&json!({ "productId": shirt["id"] }))
        .send()
        .await
        .expect("add request");

    let body = json_body(
        ctx.get("/api/cart")
            .bearer_auth(&other)
            .send()
            .await
            .expect("cart request"),
    )
    .await;
    assert_eq!(body["totalItems"], 0);
}

#[tokio::test]
async fn test_cart_total_overflow_is_rejected() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    let vault = ctx
        .create_product(
            &admin,
            product_form("Vault", "79228162514264337593543950335", ""),
        )
        .await;
    let shopper = ctx.register("rich@shop.test", "hunter2hunter2").await;

    let resp = ctx
        .post("/api/cart/add")
        .bearer_auth(&shopper)
        .json(&json!({ "productId": vault["id"], "qty": 2 }))
        .send()
        .await
        .expect("add request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["message"],
        "qty makes the cart total too large"
    );

    let resp = ctx
        .get("/api/cart")
        .bearer_auth(&shopper)
        .send()
        .await
        .expect("cart request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["totalItems"], 0);
}

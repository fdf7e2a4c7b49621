//! End-to-end flows through the router against an in-memory database.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use kassa_db::{Database, DbConfig};
use kassa_register_api::{build_router, AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.floor().upsert_department("hall", "Hall", 0).await.unwrap();
        db.floor().upsert_department("bar", "Bar", 1).await.unwrap();
        db.floor().upsert_table("t-1", "hall", "Table 1", false, 0).await.unwrap();
        db.floor().upsert_table("t-2", "hall", "Table 2", false, 1).await.unwrap();
        db.floor().upsert_table("b-1", "bar", "Stool 1", false, 0).await.unwrap();

        let config = AppConfig {
            autosave_window: Duration::from_millis(20),
            ..AppConfig::default()
        };
        TestApp {
            router: build_router(AppState::new(db, config)),
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // extractor rejections answer in plain text
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// Opens a shift with `start` kopiykas and returns its id.
    async fn open_shift(&self, start: i64) -> String {
        let (status, body) = self
            .post(
                "/shifts",
                json!({ "startBalance": start, "cashierId": "staff-1", "cashierName": "Olena" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn open_check(&self, shift_id: &str, table_id: &str) -> (StatusCode, String) {
        let (status, body) = self
            .post(
                "/checks",
                json!({
                    "tableId": table_id,
                    "tableName": table_id,
                    "departmentId": "hall",
                    "shiftId": shift_id,
                    "guestsCount": 2
                }),
            )
            .await;
        (status, body["data"]["id"].as_str().unwrap().to_string())
    }

    async fn add_item(&self, check_id: &str, product: &str, category: &str, price: i64, quantity: i64) -> Value {
        let (status, body) = self
            .post(
                &format!("/checks/{check_id}/items"),
                json!({
                    "productId": product,
                    "name": product,
                    "category": category,
                    "price": price,
                    "quantity": quantity
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_shift_open_rules() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/shifts", json!({ "startBalance": 0, "cashierId": "", "cashierName": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let shift_id = app.open_shift(100_000).await;
    let (status, body) = app
        .post("/shifts", json!({ "startBalance": 0, "cashierId": "staff-2", "cashierName": "Taras" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = app.get("/shifts/current").await;
    assert_eq!(body["data"]["id"], shift_id.as_str());
    assert_eq!(body["data"]["activeStaffIds"], json!(["staff-1"]));

    let (status, body) = app
        .send(
            Method::PUT,
            "/shifts",
            Some(json!({ "id": shift_id, "activeStaffIds": ["staff-1", "staff-7"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["activeStaffIds"], json!(["staff-1", "staff-7"]));
    assert_eq!(body["data"]["startBalance"], 100_000);
}

#[tokio::test]
async fn test_open_check_resumes_existing() {
    let app = TestApp::new().await;
    let shift_id = app.open_shift(0).await;

    let (first_status, first) = app.open_check(&shift_id, "t-1").await;
    let (second_status, second) = app.open_check(&shift_id, "t-1").await;
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);

    let (_, tables) = app.get("/tables?departmentId=hall").await;
    assert_eq!(tables["data"][0]["status"], "busy");
    assert_eq!(tables["data"][0]["openCheckId"], first.as_str());
    assert_eq!(tables["data"][1]["status"], "free");
}

#[tokio::test]
async fn test_promotion_on_category() {
    let app = TestApp::new().await;
    let shift_id = app.open_shift(0).await;

    let (status, _) = app
        .post(
            "/promotions",
            json!({
                "id": "promo-bar",
                "name": "Bar -10%",
                "isActive": true,
                "conditions": [{
                    "type": "category", "operator": "gte", "unit": "qty", "value": 1,
                    "targetNames": ["bar"]
                }],
                "result": { "type": "percent_discount", "value": 10 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, check_id) = app.open_check(&shift_id, "t-1").await;
    app.add_item(&check_id, "soup", "kitchen", 15_000, 2).await;
    let check = app.add_item(&check_id, "spritz", "bar", 20_000, 1).await;
    assert_eq!(check["subtotal"], 50_000);

    let (_, applicable) = app.get(&format!("/checks/{check_id}/promotions")).await;
    assert_eq!(applicable["data"][0]["id"], "promo-bar");

    let (status, body) = app
        .post(&format!("/checks/{check_id}/promotion"), json!({ "promotionId": "promo-bar" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["discount"], 2_000);
    assert_eq!(body["data"]["total"], 48_000);
    assert_eq!(body["data"]["appliedPromotionId"], "promo-bar");

    // re-applying replaces, it does not stack
    let (_, body) = app
        .post(&format!("/checks/{check_id}/promotion"), json!({ "promotionId": "promo-bar" }))
        .await;
    assert_eq!(body["data"]["discount"], 2_000);

    let (status, body) = app
        .send(Method::DELETE, &format!("/checks/{check_id}/promotion"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["discount"], 0);
    assert_eq!(body["data"]["total"], 50_000);
}

#[tokio::test]
async fn test_void_frees_table_without_receipt() {
    let app = TestApp::new().await;
    let shift_id = app.open_shift(0).await;
    let (_, check_id) = app.open_check(&shift_id, "t-2").await;
    app.add_item(&check_id, "tea", "bar", 4_000, 1).await;

    let (status, body) = app.post(&format!("/checks/{check_id}/void"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "void");

    let (status, body) = app.post(&format!("/checks/{check_id}/void"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, tables) = app.get("/tables?departmentId=hall").await;
    assert_eq!(tables["data"][1]["id"], "t-2");
    assert_eq!(tables["data"][1]["status"], "free");

    let (_, receipts) = app.get(&format!("/shifts/{shift_id}/receipts")).await;
    assert_eq!(receipts["data"], json!([]));
}

#[tokio::test]
async fn test_mixed_split_mismatch_then_confirm() {
    let app = TestApp::new().await;
    let shift_id = app.open_shift(0).await;
    let (_, check_id) = app.open_check(&shift_id, "t-1").await;
    app.add_item(&check_id, "billiards-hour", "games", 25_000, 1).await;

    let mut payment = json!({
        "checkId": check_id,
        "paymentMethod": "mixed",
        "paymentDetails": { "cash": 10_000, "card": 10_000 }
    });
    let (status, body) = app.post("/checkout", payment.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SPLIT_MISMATCH");
    assert_eq!(body["error"]["details"]["delta"], -5_000);

    payment["confirmMismatch"] = json!(true);
    let (status, body) = app.post("/checkout", payment.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["receiptNumber"], 1);
    assert_eq!(body["data"]["paymentMethod"], "mixed");

    // a second checkout of the same check never posts twice
    let (status, _) = app.post("/checkout", payment).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_shift_reconciliation_scenario() {
    let app = TestApp::new().await;
    let shift_id = app.open_shift(100_000).await;

    let (_, cash_check) = app.open_check(&shift_id, "t-1").await;
    app.add_item(&cash_check, "pizza", "kitchen", 25_000, 1).await;
    let (status, receipt) = app
        .post("/checkout", json!({ "checkId": cash_check, "paymentMethod": "cash", "amountGiven": 30_000 }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["data"]["change"], 5_000);

    let (_, card_check) = app.open_check(&shift_id, "t-2").await;
    app.add_item(&card_check, "karaoke", "games", 40_000, 1).await;
    let (status, _) = app
        .post("/checkout", json!({ "checkId": card_check, "paymentMethod": "card" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(
            &format!("/shifts/{shift_id}/transactions"),
            json!({ "type": "expense", "category": "supplies", "amount": 5_000 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, report) = app.get(&format!("/shifts/{shift_id}/x-report")).await;
    let report = &report["data"];
    assert_eq!(report["totalSalesCash"], 25_000);
    assert_eq!(report["totalSalesCard"], 40_000);
    assert_eq!(report["totalExpenses"], 5_000);
    assert_eq!(report["currentBalance"], 120_000);
    assert_eq!(report["transactions"].as_array().unwrap().len(), 1);

    let (_, preview) = app.get(&format!("/shifts/{shift_id}/close-preview")).await;
    assert_eq!(preview["data"]["expectedEndBalance"], 120_000);

    // 1000 + 100 + 50 + 20 + 10 = 1180 UAH counted against 1200 expected
    let counts = json!({ "1000": 1, "100": 1, "50": 1, "20": 1, "10": 1 });
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/shifts/{shift_id}"),
            Some(json!({ "denominationCounts": counts })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, closed) = app
        .send(
            Method::PUT,
            "/shifts",
            Some(json!({ "id": shift_id, "status": "closed", "endBalance": 120_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{closed}");
    assert_eq!(closed["data"]["status"], "closed");
    assert_eq!(closed["data"]["cashDifference"], -2_000);

    let (status, again) = app
        .send(Method::PUT, "/shifts", Some(json!({ "id": shift_id, "status": "closed" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{again}");

    let (_, reports) = app.get("/reports?type=z-reports").await;
    let z = &reports["data"][0];
    assert_eq!(z["shiftId"], shift_id.as_str());
    assert_eq!(z["endBalance"], 120_000);
    assert_eq!(z["cashDifference"], -2_000);
    assert_eq!(z["topServices"].as_array().unwrap().len(), 2);

    let (_, analytics) = app.get("/reports?type=analytics&limit=10").await;
    assert_eq!(analytics["data"]["receipts"].as_array().unwrap().len(), 2);

    let (_, current) = app.get("/shifts/current").await;
    assert_eq!(current["data"], Value::Null);
}

#[tokio::test]
async fn test_denomination_autosave_and_reset() {
    let app = TestApp::new().await;
    let shift_id = app.open_shift(0).await;
    let uri = format!("/shifts/{shift_id}/denominations");

    let (status, body) = app.post(&uri, json!({ "key": "3", "count": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = app.post(&uri, json!({ "key": "500", "count": 2 })).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = app.post(&uri, json!({ "key": "0.5", "count": 3 })).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let (_, shift) = app.get(&format!("/shifts/{shift_id}")).await;
    assert_eq!(shift["data"]["denominationCounts"]["500"], 2);
    assert_eq!(shift["data"]["denominationCounts"]["0.5"], 3);

    let (status, body) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["denominationCounts"], json!({}));
}

#[tokio::test]
async fn test_receipt_comment_correction_appends_history() {
    let app = TestApp::new().await;
    let shift_id = app.open_shift(0).await;
    let (_, check_id) = app.open_check(&shift_id, "t-1").await;
    app.add_item(&check_id, "tea", "bar", 4_000, 1).await;
    let (_, receipt) = app
        .post("/checkout", json!({ "checkId": check_id, "paymentMethod": "card" }))
        .await;
    let receipt_id = receipt["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/receipts/{receipt_id}"),
            Some(json!({ "action": "comment", "comment": "moved to terrace", "actor": "admin-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["comment"], "moved to terrace");

    let history = body["data"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["action"], "created");
    assert_eq!(history[1]["action"], "update_comment");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/checks/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = app.get("/shifts/missing/x-report").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/reports?type=weekly").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

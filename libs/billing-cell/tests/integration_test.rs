use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use billing_cell::router::billing_routes;
use billing_cell::{BillStatus, BillingService, TotalChange};
use rust_decimal::Decimal;
use shared_utils::clock::clinic_year;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn setup() -> (MockServer, Router, String) {
    let server = MockServer::start().await;
    let config = TestConfig::with_store(&server.uri()).to_arc();
    let token = JwtTestUtils::bearer(&TestUser::reception("desk@clinic.in"), &config);
    (server, billing_routes(config), token)
}

async fn mount_bill(server: &MockServer, grand_total: i64, status: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/bills"))
        .and(query_param("visit_id", "eq.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::bill_row(1, 10, "BILL-2024-001", grand_total, status)
        ])))
        .mount(server)
        .await;
}

async fn mount_payments(server: &MockServer, payments: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("bill_id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payments))
        .mount(server)
        .await;
}

fn pay_request(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/visits/10/add_payment/")
        .header("authorization", token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_first_payment_leaves_bill_partially_paid() {
    let (server, app, token) = setup().await;
    mount_bill(&server, 2500, "unpaid").await;
    mount_payments(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/record_payment"))
        .and(body_partial_json(json!({
            "p_bill_id": 1,
            "p_amount": "1000",
            "p_mode": "cash",
            "p_expected_total": "2500",
            "p_expected_paid": "0",
            "p_status": "partially_paid"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::payment_row(7, 1, 1000),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .oneshot(pay_request(&token, json!({ "amount": 1000, "mode": "cash" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "partially_paid");
    assert_eq!(json["payment_id"], 7);
    assert_eq!(json["totalPaid"], "1000");
    assert_eq!(json["balance"], "1500");
}

#[tokio::test]
async fn test_second_payment_settles_bill() {
    let (server, app, token) = setup().await;
    mount_bill(&server, 2500, "partially_paid").await;
    mount_payments(&server, json!([MockSupabaseResponses::payment_row(7, 1, 1000)])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/record_payment"))
        .and(body_partial_json(json!({
            "p_amount": "1500",
            "p_expected_paid": "1000",
            "p_status": "paid"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::payment_row(8, 1, 1500),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .oneshot(pay_request(&token, json!({ "amount": "1500", "mode": "UPI" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "paid");
    assert_eq!(json["totalPaid"], "2500");
    assert_eq!(json["balance"], "0");
}

#[tokio::test]
async fn test_non_numeric_amount_is_rejected_without_writing() {
    let (server, app, token) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bills"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/record_payment"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app
        .oneshot(pay_request(&token, json!({ "amount": "abc" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("amount"));
}

#[tokio::test]
async fn test_zero_amount_is_rejected() {
    let (server, app, token) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/record_payment"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app
        .oneshot(pay_request(&token, json!({ "amount": 0 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_conflicting_payment_is_retried_with_fresh_sum() {
    let (server, app, token) = setup().await;
    mount_bill(&server, 2500, "unpaid").await;
    mount_payments(&server, json!([])).await;

    // Someone else paid between our read and our write.
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/record_payment"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "PT409",
            "message": "bill changed"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/record_payment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::payment_row(9, 1, 500),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .oneshot(pay_request(&token, json!({ "amount": 500 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["payment_id"], 9);
}

#[tokio::test]
async fn test_bill_is_created_once_and_reused() {
    let server = MockServer::start().await;
    let config = TestConfig::with_store(&server.uri()).to_arc();
    let token = JwtTestUtils::bearer(&TestUser::doctor("doc@clinic.in"), &config);

    // No bill on the first lookup, the created one afterwards.
    Mock::given(method("GET"))
        .and(path("/rest/v1/bills"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_bill(&server, 2500, "unpaid").await;
    mount_payments(&server, json!([])).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "total_amount": 2500 }])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_sequence"))
        .and(body_partial_json(json!({ "p_scope": "bill" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/bills"))
        .and(body_partial_json(json!({ "visit_id": 10, "grand_total": "2500", "status": "unpaid" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::bill_row(1, 10, "BILL-2024-001", 2500, "unpaid")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let response = billing_routes(config.clone())
            .oneshot(
                Request::builder()
                    .uri("/visits/10/bill/")
                    .header("authorization", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["balance"], "2500");
        numbers.push(json["billNumber"].clone());
    }

    assert_eq!(numbers[0], "BILL-2024-001");
    assert_eq!(numbers[0], numbers[1]);
}

#[tokio::test]
async fn test_total_change_reads_bill_and_paid_sum() {
    let server = MockServer::start().await;
    let config = TestConfig::with_store(&server.uri()).to_arc();
    mount_bill(&server, 500, "paid").await;
    mount_payments(&server, json!([MockSupabaseResponses::payment_row(7, 1, 500)])).await;

    let change = BillingService::new(&config)
        .prepare_total_change(10, Decimal::from(2500))
        .await
        .unwrap();

    assert_eq!(
        change,
        Some(TotalChange {
            bill_id: 1,
            expected_paid: Decimal::from(500),
            status: BillStatus::PartiallyPaid,
        })
    );
}

#[tokio::test]
async fn test_total_change_without_bill_writes_nothing() {
    let server = MockServer::start().await;
    let config = TestConfig::with_store(&server.uri()).to_arc();

    Mock::given(method("GET"))
        .and(path("/rest/v1/bills"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let change = BillingService::new(&config)
        .prepare_total_change(10, Decimal::from(2500))
        .await
        .unwrap();

    assert_eq!(change, None);
}

#[tokio::test]
async fn test_bill_number_uses_clinic_year() {
    let server = MockServer::start().await;
    let config = TestConfig::with_store(&server.uri()).to_arc();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_sequence"))
        .and(body_partial_json(json!({ "p_scope": "bill", "p_year": clinic_year() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(4)))
        .expect(1)
        .mount(&server)
        .await;

    let number = BillingService::new(&config).next_bill_number().await.unwrap();

    assert_eq!(number, format!("BILL-{}-004", clinic_year()));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (_server, app, _token) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/visits/10/bill/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

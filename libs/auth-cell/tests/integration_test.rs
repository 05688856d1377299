use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::{auth_routes, user_routes};
use auth_cell::services::PasswordService;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn setup() -> (MockServer, Arc<AppConfig>) {
    let server = MockServer::start().await;
    let config = TestConfig::with_store(&server.uri()).to_arc();
    (server, config)
}

fn app(config: Arc<AppConfig>) -> Router {
    Router::new()
        .merge(auth_routes(config.clone()))
        .merge(user_routes(config))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", token)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn mount_credentials(server: &MockServer, id: Uuid, password: &str, active: bool) {
    let mut row = MockSupabaseResponses::user_row(id, "desk@clinic.in", "reception");
    row["password_hash"] = json!(PasswordService::hash_password(password).unwrap());
    row["is_active"] = json!(active);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.desk@clinic.in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

// ==============================================================================
// LOGIN / REFRESH
// ==============================================================================

#[tokio::test]
async fn test_login_returns_tokens_and_profile() {
    let (server, config) = setup().await;
    let id = Uuid::new_v4();
    mount_credentials(&server, id, "clinic@123", true).await;

    let response = app(config)
        .oneshot(json_request(
            "POST",
            "/auth/login/",
            None,
            json!({ "email": "Desk@Clinic.in", "password": "clinic@123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["role"], "reception");
    assert_eq!(json["name"], "Reception Desk");
    assert_eq!(json["access"].as_str().unwrap().split('.').count(), 3);
    assert!(json["refresh"].is_string());
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let (server, config) = setup().await;
    mount_credentials(&server, Uuid::new_v4(), "clinic@123", true).await;

    let response = app(config)
        .oneshot(json_request(
            "POST",
            "/auth/login/",
            None,
            json!({ "email": "desk@clinic.in", "password": "guess" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No active account found with the given credentials");
}

#[tokio::test]
async fn test_inactive_account_cannot_login() {
    let (server, config) = setup().await;
    mount_credentials(&server, Uuid::new_v4(), "clinic@123", false).await;

    let response = app(config)
        .oneshot(json_request(
            "POST",
            "/auth/login/",
            None,
            json!({ "email": "desk@clinic.in", "password": "clinic@123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let (_server, config) = setup().await;
    let user = TestUser::doctor("doc@clinic.in");
    let access = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let response = app(config)
        .oneshot(json_request("POST", "/auth/refresh/", None, json!({ "refresh": access })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let (server, config) = setup().await;
    let user = TestUser::reception("desk@clinic.in");
    let refresh = JwtTestUtils::create_refresh_token(&user, &config.jwt_secret);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(user.id, "desk@clinic.in", "reception")
        ])))
        .mount(&server)
        .await;

    let response = app(config.clone())
        .oneshot(json_request("POST", "/auth/refresh/", None, json!({ "refresh": refresh })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let access = body_json(response).await["access"].as_str().unwrap().to_string();

    // the new token opens protected routes
    let response = app(config)
        .oneshot(empty_request("GET", "/auth/me/", &format!("Bearer {}", access)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "desk@clinic.in");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (_server, config) = setup().await;
    let token = JwtTestUtils::create_expired_token(&TestUser::default(), &config.jwt_secret);

    let response = app(config)
        .oneshot(empty_request("GET", "/auth/me/", &format!("Bearer {}", token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ==============================================================================
// USER ACCOUNTS
// ==============================================================================

#[tokio::test]
async fn test_reception_cannot_delete_users() {
    let (server, config) = setup().await;
    let token = JwtTestUtils::bearer(&TestUser::reception("desk@clinic.in"), &config);
    let target = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(config)
        .oneshot(empty_request("DELETE", &format!("/users/{}/", target), &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Only admins can delete users.");
}

#[tokio::test]
async fn test_admin_deletes_user() {
    let (server, config) = setup().await;
    let token = JwtTestUtils::bearer(&TestUser::admin("admin@clinic.in"), &config);
    let target = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", target)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": target }])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(config)
        .oneshot(empty_request("DELETE", &format!("/users/{}/", target), &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_superuser_counts_as_admin() {
    let (server, config) = setup().await;
    let mut doctor = TestUser::doctor("owner@clinic.in");
    doctor.is_superuser = true;
    let token = JwtTestUtils::bearer(&doctor, &config);
    let target = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": target }])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(config)
        .oneshot(empty_request("DELETE", &format!("/users/{}/", target), &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let (_server, config) = setup().await;
    let admin = TestUser::admin("admin@clinic.in");
    let token = JwtTestUtils::bearer(&admin, &config);

    let response = app(config)
        .oneshot(empty_request("DELETE", &format!("/users/{}/", admin.id), &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_creates_user_with_defaults() {
    let (server, config) = setup().await;
    let token = JwtTestUtils::bearer(&TestUser::admin("admin@clinic.in"), &config);
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({
            "email": "new.doc@clinic.in",
            "username": "new.doc@clinic.in",
            "role": "doctor",
            "first_name": "Anil",
            "last_name": "Kumar"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_row(id, "new.doc@clinic.in", "doctor")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(config)
        .oneshot(json_request(
            "POST",
            "/users/",
            Some(&token),
            json!({ "email": "New.Doc@clinic.in", "password": "s3cret!", "name": "Anil Kumar" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["id"], id.to_string());
    assert!(json.get("password").is_none());
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn test_doctor_cannot_create_user() {
    let (_server, config) = setup().await;
    let token = JwtTestUtils::bearer(&TestUser::doctor("doc@clinic.in"), &config);

    let response = app(config)
        .oneshot(json_request(
            "POST",
            "/users/",
            Some(&token),
            json!({ "email": "x@clinic.in", "password": "pw" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_doctor_lists_only_self() {
    let (server, config) = setup().await;
    let doctor = TestUser::doctor("doc@clinic.in");
    let token = JwtTestUtils::bearer(&doctor, &config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(doctor.id, "doc@clinic.in", "doctor")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(config)
        .oneshot(empty_request("GET", "/users/", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], doctor.id.to_string());
}

#[tokio::test]
async fn test_doctor_cannot_change_own_role() {
    let (server, config) = setup().await;
    let doctor = TestUser::doctor("doc@clinic.in");
    let token = JwtTestUtils::bearer(&doctor, &config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(doctor.id, "doc@clinic.in", "doctor")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(config)
        .oneshot(json_request(
            "PATCH",
            &format!("/users/{}/", doctor.id),
            Some(&token),
            json!({ "role": "admin" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_doctor_updates_own_mobile() {
    let (server, config) = setup().await;
    let doctor = TestUser::doctor("doc@clinic.in");
    let token = JwtTestUtils::bearer(&doctor, &config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(doctor.id, "doc@clinic.in", "doctor")
        ])))
        .mount(&server)
        .await;

    let mut updated = MockSupabaseResponses::user_row(doctor.id, "doc@clinic.in", "doctor");
    updated["mobile"] = json!("9847012345");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "mobile": "9847012345" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(config)
        .oneshot(json_request(
            "PUT",
            &format!("/users/{}/", doctor.id),
            Some(&token),
            json!({ "mobile": "9847012345", "role": "doctor" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["mobile"], "9847012345");
}

#[tokio::test]
async fn test_doctor_cannot_edit_someone_else() {
    let (_server, config) = setup().await;
    let token = JwtTestUtils::bearer(&TestUser::doctor("doc@clinic.in"), &config);

    let response = app(config)
        .oneshot(json_request(
            "PUT",
            &format!("/users/{}/", Uuid::new_v4()),
            Some(&token),
            json!({ "mobile": "9847012345" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

//! Employee CRUD and role assignment endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{expect_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_unauthenticated(Method::GET, "/api/v1/employees")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_and_health_do_not_require_auth() {
    let app = TestApp::new().await;

    let response = app
        .request_unauthenticated(Method::GET, "/api/v1/status")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_unauthenticated(Method::GET, "/api/v1/health")
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn employee_crud_roundtrip() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/employees",
            Some(json!({
                "first_name": "Ana",
                "last_name": "Rivera",
                "display_name": "Ana Rivera",
                "email": "ana@primefire.us",
                "title": "SysAdmin"
            })),
        )
        .await;
    let created = expect_json(response, StatusCode::CREATED).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["display_name"], "Ana Rivera");

    let response = app
        .request(Method::GET, &format!("/api/v1/employees/{}", id), None)
        .await;
    let fetched = expect_json(response, StatusCode::OK).await;
    assert_eq!(fetched["email"], "ana@primefire.us");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/employees/{}", id),
            Some(json!({ "title": "IT Manager" })),
        )
        .await;
    let updated = expect_json(response, StatusCode::OK).await;
    assert_eq!(updated["title"], "IT Manager");
    // Untouched fields survive partial updates
    assert_eq!(updated["email"], "ana@primefire.us");

    let response = app
        .request(Method::DELETE, &format!("/api/v1/employees/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/v1/employees/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_email_fails_validation() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/employees",
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn missing_employee_is_404() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/employees/99999", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_assignment_lifecycle() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("oid-roles", "Role Holder").await;
    let role = app.seed_role("staff").await;

    let uri = format!("/api/v1/employees/{}/roles/{}", employee.id, role.id);

    let response = app.request(Method::POST, &uri, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Double assignment is rejected
    let response = app.request(Method::POST, &uri, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/employees/{}/roles", employee.id),
            None,
        )
        .await;
    let roles = expect_json(response, StatusCode::OK).await;
    assert_eq!(roles.as_array().unwrap().len(), 1);
    assert_eq!(roles[0]["name"], "staff");

    let response = app.request(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/employees/{}/roles", employee.id),
            None,
        )
        .await;
    let roles = expect_json(response, StatusCode::OK).await;
    assert_eq!(roles.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn assigning_unknown_role_is_404() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("oid-unknown-role", "Holder").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/employees/{}/roles/4242", employee.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Permission aggregation and the /permissions endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{expect_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn my_permissions_or_combines_flags_across_roles() {
    let app = TestApp::new().await;

    let employee = app.seed_employee("oid-merge", "Merge User").await;
    let viewer = app.seed_role("viewer").await;
    let editor = app.seed_role("editor").await;
    let dashboard = app.seed_module("dashboard").await;

    app.assign_role(employee.id, viewer.id).await;
    app.assign_role(employee.id, editor.id).await;
    app.grant(
        viewer.id,
        dashboard.id,
        [true, false, false, false, false, false, false],
    )
    .await;
    app.grant(
        editor.id,
        dashboard.id,
        [false, true, true, false, false, false, false],
    )
    .await;

    let response = app
        .request_as("oid-merge", Method::GET, "/api/v1/permissions/me", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;

    let permissions = body["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), 1);
    let flags = &permissions[0]["permissions"];
    assert_eq!(flags["can_view"], true);
    assert_eq!(flags["can_create"], true);
    assert_eq!(flags["can_edit"], true);
    assert_eq!(flags["can_delete"], false);
    assert_eq!(flags["can_export"], false);
    assert_eq!(flags["admin_actions"], false);

    // dashboard is viewable, so it is accessible
    let accessible = body["accessible_modules"].as_array().unwrap();
    assert_eq!(accessible.len(), 1);
    assert_eq!(accessible[0]["key"], "dashboard");
}

#[tokio::test]
async fn employee_without_roles_gets_empty_permission_set() {
    let app = TestApp::new().await;
    app.seed_employee("oid-lonely", "No Roles").await;

    let response = app
        .request_as("oid-lonely", Method::GET, "/api/v1/permissions/me", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;

    assert_eq!(body["roles"].as_array().unwrap().len(), 0);
    assert_eq!(body["permissions"].as_array().unwrap().len(), 0);
    assert_eq!(body["accessible_modules"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn module_without_view_flag_is_not_accessible() {
    let app = TestApp::new().await;

    let employee = app.seed_employee("oid-hidden", "Hidden").await;
    let role = app.seed_role("exporter").await;
    let reports = app.seed_module("reports").await;

    app.assign_role(employee.id, role.id).await;
    app.grant(
        role.id,
        reports.id,
        [false, false, false, false, true, false, false],
    )
    .await;

    let response = app
        .request_as("oid-hidden", Method::GET, "/api/v1/permissions/me", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;

    assert_eq!(body["permissions"].as_array().unwrap().len(), 1);
    assert_eq!(body["accessible_modules"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unprovisioned_caller_gets_404_from_me() {
    let app = TestApp::new().await;

    let response = app
        .request_as("oid-ghost", Method::GET, "/api/v1/permissions/me", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_permission_validates_role_module_and_uniqueness() {
    let app = TestApp::new().await;
    app.seed_employee("oid-default", "Admin").await;
    let role = app.seed_role("staff").await;
    let module = app.seed_module("licenses").await;

    // Unknown role
    let response = app
        .request(
            Method::POST,
            "/api/v1/permissions",
            Some(json!({ "role_id": 9999, "module_id": module.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unknown module
    let response = app
        .request(
            Method::POST,
            "/api/v1/permissions",
            Some(json!({ "role_id": role.id, "module_id": 9999 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // First grant succeeds with can_view defaulting to true
    let response = app
        .request(
            Method::POST,
            "/api/v1/permissions",
            Some(json!({ "role_id": role.id, "module_id": module.id, "can_edit": true })),
        )
        .await;
    let body = expect_json(response, StatusCode::CREATED).await;
    assert_eq!(body["can_view"], true);
    assert_eq!(body["can_edit"], true);
    assert_eq!(body["can_delete"], false);

    // Duplicate pair is rejected
    let response = app
        .request(
            Method::POST,
            "/api/v1/permissions",
            Some(json!({ "role_id": role.id, "module_id": module.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn permission_pair_update_and_delete() {
    let app = TestApp::new().await;
    app.seed_employee("oid-default", "Admin").await;
    let role = app.seed_role("staff").await;
    let module = app.seed_module("hardware").await;
    app.grant(
        role.id,
        module.id,
        [true, false, false, false, false, false, false],
    )
    .await;

    let uri = format!("/api/v1/permissions/{}/{}", role.id, module.id);

    let response = app
        .request(Method::PUT, &uri, Some(json!({ "can_delete": true })))
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["can_delete"], true);
    assert_eq!(body["can_view"], true);

    let response = app.request(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.request(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_update_replaces_role_permissions() {
    let app = TestApp::new().await;
    app.seed_employee("oid-default", "Admin").await;
    let role = app.seed_role("staff").await;
    let old_module = app.seed_module("old").await;
    let new_module = app.seed_module("new").await;
    app.grant(
        role.id,
        old_module.id,
        [true, true, true, true, true, true, true],
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/permissions/bulk-update",
            Some(json!({
                "role_id": role.id,
                "permissions": [
                    { "role_id": role.id, "module_id": new_module.id, "can_view": true }
                ]
            })),
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;

    let permissions = body["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), 1);
    assert_eq!(permissions[0]["module_key"], "new");

    // The old pair is gone
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/permissions/{}/{}", role.id, old_module.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_and_module_permission_listings_include_details() {
    let app = TestApp::new().await;
    app.seed_employee("oid-default", "Admin").await;
    let role = app.seed_role("staff").await;
    let module = app.seed_module("tickets").await;
    app.grant(
        role.id,
        module.id,
        [true, false, false, false, false, true, false],
    )
    .await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/permissions/role/{}", role.id),
            None,
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["role_name"], "staff");
    assert_eq!(body["permissions"][0]["module_key"], "tickets");
    assert_eq!(body["permissions"][0]["admin_actions"], true);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/permissions/module/{}", module.id),
            None,
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body[0]["role_name"], "staff");
}

//! Directory sync against a mock Graph API.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::{expect_json, TestApp};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use primefire_api::entities::{country, employee};
use primefire_api::services::sync::SyncOutcome;

fn graph_user(id: &str, upn: Option<&str>, country: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "userPrincipalName": upn,
        "displayName": upn.map(|u| u.split('@').next().unwrap().to_uppercase()),
        "givenName": "Given",
        "surname": "Sur",
        "jobTitle": "Engineer",
        "department": "IT",
        "officeLocation": "HQ",
        "mail": upn,
        "businessPhones": ["+1 555 0100"],
        "mobilePhone": "+1 555 0200",
        "streetAddress": "1 Main St",
        "city": "San Juan",
        "state": "PR",
        "postalCode": "00901",
        "country": country,
        "countryLetterCode": null,
    })
}

/// Mount token endpoint + paginated /users on a fresh mock server
async fn mount_directory(server: &MockServer, delay: Option<Duration>) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mock-token",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;

    // Page 2 first so the generic /users mock does not shadow it
    Mock::given(method("GET"))
        .and(path("/graph/users"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                graph_user("oid-luis", Some("luis@primefire.do"), Some("United States")),
                graph_user("oid-bob", Some("bob@example.com"), Some("Germany")),
                { "id": "oid-empty", "userPrincipalName": null, "mail": null },
            ],
        })))
        .mount(server)
        .await;

    let mut page1 = ResponseTemplate::new(200).set_body_json(json!({
        "value": [
            graph_user("oid-ana", Some("ana@primefire.us"), Some("USA")),
        ],
        "@odata.nextLink": format!("{}/graph/users?page=2", server.uri()),
    }));
    if let Some(delay) = delay {
        page1 = page1.set_delay(delay);
    }

    Mock::given(method("GET"))
        .and(path("/graph/users"))
        .respond_with(page1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sync_filters_maps_and_upserts() {
    let server = MockServer::start().await;
    mount_directory(&server, None).await;

    let app = TestApp::with_graph(
        &format!("{}/graph", server.uri()),
        &format!("{}/token", server.uri()),
    )
    .await;

    let outcome = app.state.sync.trigger().await.expect("sync run");
    let stats = match outcome {
        SyncOutcome::Completed(stats) => stats,
        SyncOutcome::AlreadyRunning => panic!("no run should be in flight"),
    };

    assert_eq!(stats.total_fetched, 4);
    assert_eq!(stats.matched, 2);
    assert_eq!(stats.created, 2);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.errors, 0);
    // "USA" and "United States" normalize to the same row
    assert_eq!(stats.countries_created, 1);

    let ana = employee::Entity::find()
        .filter(employee::Column::AzureOid.eq("oid-ana"))
        .one(&app.state.db)
        .await
        .unwrap()
        .expect("ana synced");
    assert_eq!(ana.first_name.as_deref(), Some("Given"));
    assert_eq!(ana.title.as_deref(), Some("Engineer"));
    assert_eq!(ana.office_phone.as_deref(), Some("+1 555 0100"));
    assert!(ana.last_synced_at.is_some());
    assert!(ana.country_id.is_some());

    let luis = employee::Entity::find()
        .filter(employee::Column::AzureOid.eq("oid-luis"))
        .one(&app.state.db)
        .await
        .unwrap()
        .expect("luis synced");
    assert_eq!(luis.country_id, ana.country_id);

    // Outside-domain and email-less records never land locally
    let outsiders = employee::Entity::find()
        .filter(employee::Column::AzureOid.is_in(["oid-bob", "oid-empty"]))
        .all(&app.state.db)
        .await
        .unwrap();
    assert!(outsiders.is_empty());

    let countries = country::Entity::find().all(&app.state.db).await.unwrap();
    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0].code, "US");
}

#[tokio::test]
async fn resync_with_unchanged_data_is_idempotent() {
    let server = MockServer::start().await;
    mount_directory(&server, None).await;

    let app = TestApp::with_graph(
        &format!("{}/graph", server.uri()),
        &format!("{}/token", server.uri()),
    )
    .await;

    app.state.sync.trigger().await.expect("first run");
    let before = employee::Entity::find()
        .filter(employee::Column::AzureOid.eq("oid-ana"))
        .one(&app.state.db)
        .await
        .unwrap()
        .unwrap();

    let outcome = app.state.sync.trigger().await.expect("second run");
    let stats = match outcome {
        SyncOutcome::Completed(stats) => stats,
        SyncOutcome::AlreadyRunning => panic!("no run should be in flight"),
    };
    assert_eq!(stats.created, 0);
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.countries_created, 0);

    let after = employee::Entity::find()
        .filter(employee::Column::AzureOid.eq("oid-ana"))
        .one(&app.state.db)
        .await
        .unwrap()
        .unwrap();

    // last_synced_at moves; everything else is identical
    assert!(after.last_synced_at >= before.last_synced_at);
    assert_eq!(after.id, before.id);
    assert_eq!(after.azure_upn, before.azure_upn);
    assert_eq!(after.first_name, before.first_name);
    assert_eq!(after.last_name, before.last_name);
    assert_eq!(after.display_name, before.display_name);
    assert_eq!(after.title, before.title);
    assert_eq!(after.department, before.department);
    assert_eq!(after.email, before.email);
    assert_eq!(after.country_id, before.country_id);
}

#[tokio::test]
async fn concurrent_trigger_is_a_no_op() {
    let server = MockServer::start().await;
    mount_directory(&server, Some(Duration::from_millis(300))).await;

    let app = TestApp::with_graph(
        &format!("{}/graph", server.uri()),
        &format!("{}/token", server.uri()),
    )
    .await;

    let scheduler = app.state.sync.clone();
    let (first, second) = tokio::join!(scheduler.trigger(), scheduler.trigger());

    let outcomes = [first.expect("first"), second.expect("second")];
    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, SyncOutcome::Completed(_)))
        .count();
    let noops = outcomes
        .iter()
        .filter(|o| matches!(o, SyncOutcome::AlreadyRunning))
        .count();
    assert_eq!(completed, 1, "exactly one run should execute");
    assert_eq!(noops, 1, "the overlapping trigger must be a no-op");

    // Only one run's worth of rows
    let employees = employee::Entity::find().all(&app.state.db).await.unwrap();
    assert_eq!(employees.len(), 2);
}

#[tokio::test]
async fn sync_endpoints_report_stats_and_status() {
    let server = MockServer::start().await;
    mount_directory(&server, None).await;

    let app = TestApp::with_graph(
        &format!("{}/graph", server.uri()),
        &format!("{}/token", server.uri()),
    )
    .await;
    app.seed_employee("oid-default", "Operator").await;

    let response = app
        .request(Method::GET, "/api/v1/employees/sync/status", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["running"], false);
    assert!(body["last_synced_at"].is_null());

    let response = app
        .request(Method::POST, "/api/v1/employees/sync", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["started"], true);
    assert_eq!(body["stats"]["matched"], 2);

    let response = app
        .request(Method::GET, "/api/v1/employees/sync/status", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["running"], false);
    assert!(!body["last_synced_at"].is_null());
    assert_eq!(body["last_stats"]["created"], 2);
}

#[tokio::test]
async fn single_record_pull_updates_one_employee() {
    let server = MockServer::start().await;
    mount_directory(&server, None).await;

    Mock::given(method("GET"))
        .and(path("/graph/users/oid-solo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graph_user(
            "oid-solo",
            Some("solo@primefire.us"),
            Some("Puerto Rico"),
        )))
        .mount(&server)
        .await;

    let app = TestApp::with_graph(
        &format!("{}/graph", server.uri()),
        &format!("{}/token", server.uri()),
    )
    .await;
    let solo = app.seed_employee("oid-solo", "Solo").await;
    app.seed_employee("oid-default", "Operator").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/employees/{}/sync-from-directory", solo.id),
            None,
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["title"], "Engineer");
    assert!(!body["last_synced_at"].is_null());
}

#[tokio::test]
async fn single_record_pull_surfaces_upstream_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mock-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graph/users/oid-broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let app = TestApp::with_graph(
        &format!("{}/graph", server.uri()),
        &format!("{}/token", server.uri()),
    )
    .await;
    let broken = app.seed_employee("oid-broken", "Broken").await;
    app.seed_employee("oid-default", "Operator").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/employees/{}/sync-from-directory", broken.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn push_to_directory_sends_non_null_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mock-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/graph/users/oid-push"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graph/users/oid-push"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graph_user(
            "oid-push",
            Some("push@primefire.us"),
            None,
        )))
        .mount(&server)
        .await;

    let app = TestApp::with_graph(
        &format!("{}/graph", server.uri()),
        &format!("{}/token", server.uri()),
    )
    .await;
    let pushed = app.seed_employee("oid-push", "Pusher").await;
    app.seed_employee("oid-default", "Operator").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/employees/{}/push-to-directory", pushed.id),
            None,
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["employee_id"], pushed.id);
    assert_eq!(body["directory_user"]["id"], "oid-push");
}

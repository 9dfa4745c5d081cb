//! Test harness: real router over a temporary SQLite database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use primefire_api::{
    auth::AzureClaims,
    config::AppConfig,
    db,
    entities::{employee, employee_role, module, module_permission, role},
    graph::GraphClient,
    services::sync::{DirectorySync, SyncScheduler},
    AppState,
};

pub const TEST_TENANT: &str = "tenant-test";
pub const TEST_CLIENT_ID: &str = "primefire-backend-test";

/// Application harness backed by a throwaway SQLite database
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _tmp: TempDir,
}

pub fn test_config(tmp: &TempDir) -> AppConfig {
    let db_path = tmp.path().join("primefire_test.db");
    AppConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        host: "127.0.0.1".to_string(),
        port: 18080,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        cors_allow_credentials: false,
        upload_dir: tmp.path().join("uploads").display().to_string(),
        tenant_id: TEST_TENANT.to_string(),
        backend_client_id: TEST_CLIENT_ID.to_string(),
        token_leeway_secs: 60,
        graph_tenant_id: "tenant-test".to_string(),
        graph_client_id: "graph-client".to_string(),
        graph_client_secret: "graph-secret".to_string(),
        graph_base_url: "http://127.0.0.1:1/graph".to_string(),
        graph_token_url: Some("http://127.0.0.1:1/token".to_string()),
        sync_enabled: false,
        sync_interval_hours: 24,
        sync_domain_token: "primefire".to_string(),
    }
}

impl TestApp {
    /// Construct a fresh application with its own database
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let cfg = test_config(&tmp);
        Self::from_config(cfg, tmp).await
    }

    /// Construct an application whose Graph client points at a mock server
    pub async fn with_graph(graph_base_url: &str, graph_token_url: &str) -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let mut cfg = test_config(&tmp);
        cfg.graph_base_url = graph_base_url.to_string();
        cfg.graph_token_url = Some(graph_token_url.to_string());
        Self::from_config(cfg, tmp).await
    }

    async fn from_config(cfg: AppConfig, tmp: TempDir) -> Self {
        let pool = db::establish_connection(&cfg.database_url)
            .await
            .expect("database connection");
        db::create_tables(&pool).await.expect("schema creation");

        let graph = Arc::new(GraphClient::from_config(&cfg));
        let directory_sync = Arc::new(DirectorySync::new(
            graph.clone(),
            pool.clone(),
            cfg.sync_domain_token.clone(),
        ));
        let scheduler = Arc::new(SyncScheduler::new(directory_sync, cfg.sync_interval_hours));

        let state = AppState {
            db: pool,
            config: cfg,
            graph,
            sync: scheduler,
        };

        let router = primefire_api::build_router(state.clone());

        Self {
            router,
            state,
            _tmp: tmp,
        }
    }

    /// Mint a bearer token for the test tenant
    pub fn token_for_oid(&self, oid: &str) -> String {
        let claims = AzureClaims {
            aud: format!("api://{}", TEST_CLIENT_ID),
            iss: format!("https://sts.windows.net/{}/", TEST_TENANT),
            exp: Utc::now().timestamp() + 3600,
            oid: Some(oid.to_string()),
            upn: Some(format!("{}@primefire.us", oid)),
            preferred_username: None,
            name: Some("Test User".to_string()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-only"),
        )
        .expect("token")
    }

    /// Authenticated request with an arbitrary oid
    pub async fn request_as(
        &self,
        oid: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token_for_oid(oid)));

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router.clone().oneshot(request).await.expect("response")
    }

    /// Authenticated request as the default test user
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.request_as("oid-default", method, uri, body).await
    }

    /// Request without any Authorization header
    pub async fn request_unauthenticated(&self, method: Method, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    // ---- seeding helpers -------------------------------------------------

    pub async fn seed_employee(&self, oid: &str, display_name: &str) -> employee::Model {
        employee::ActiveModel {
            azure_oid: Set(Some(oid.to_string())),
            azure_upn: Set(Some(format!("{}@primefire.us", oid))),
            display_name: Set(Some(display_name.to_string())),
            email: Set(Some(format!("{}@primefire.us", oid))),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.state.db)
        .await
        .expect("seed employee")
    }

    pub async fn seed_role(&self, name: &str) -> role::Model {
        role::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            ..Default::default()
        }
        .insert(&self.state.db)
        .await
        .expect("seed role")
    }

    pub async fn seed_module(&self, key: &str) -> module::Model {
        module::ActiveModel {
            name: Set(key.to_string()),
            key: Set(key.to_string()),
            display_order: Set(0),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.state.db)
        .await
        .expect("seed module")
    }

    pub async fn assign_role(&self, employee_id: i32, role_id: i32) {
        employee_role::ActiveModel {
            employee_id: Set(employee_id),
            role_id: Set(role_id),
        }
        .insert(&self.state.db)
        .await
        .expect("assign role");
    }

    /// Grant a (role, module) permission row with the given flags:
    /// [view, create, edit, delete, export, admin, other]
    pub async fn grant(&self, role_id: i32, module_id: i32, flags: [bool; 7]) {
        module_permission::ActiveModel {
            role_id: Set(role_id),
            module_id: Set(module_id),
            can_view: Set(flags[0]),
            can_create: Set(flags[1]),
            can_edit: Set(flags[2]),
            can_delete: Set(flags[3]),
            can_export: Set(flags[4]),
            admin_actions: Set(flags[5]),
            other_actions: Set(flags[6]),
            assigned_at: Set(Utc::now()),
        }
        .insert(&self.state.db)
        .await
        .expect("grant permission");
    }
}

/// Collect a response body as JSON
pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Assert a status and return the parsed body
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status, "unexpected response status");
    response_json(response).await
}

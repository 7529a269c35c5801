#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Duration;
use datalab_api::{
    auth::{SessionClaims, TokenVerifier},
    build_router,
    config::{AppConfig, RecordStoreConfig},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

pub const JWT_SECRET: &str = "0d4f8a2c6e1b9d3f7a5c2e8b4d6f1a3c";
pub const BASE_ID: &str = "appLab";
pub const API_KEY: &str = "patTest";
pub const ENTRADAS_TABLE: &str = "tblEntradas";
pub const INSUMOS_TABLE: &str = "tblInsumos";
pub const EQUIPO_TABLE: &str = "tblEquipo";

/// Application wired to a mock record store.
pub struct TestApp {
    router: Router,
    pub store: MockServer,
    pub state: AppState,
    token: String,
}

impl TestApp {
    /// Fully configured application
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Application whose configuration is adjusted before startup
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let store = MockServer::start().await;

        let mut record_store =
            RecordStoreConfig::new(format!("{}/v0", store.uri()), BASE_ID, API_KEY);
        record_store.tables.entrada_insumos = Some(ENTRADAS_TABLE.into());
        record_store.tables.insumos = Some(INSUMOS_TABLE.into());
        record_store.tables.equipo_laboratorio = Some(EQUIPO_TABLE.into());

        let mut cfg = AppConfig::new(
            JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
            record_store,
        );
        adjust(&mut cfg);

        let state = AppState::new(cfg).expect("failed to build app state");
        let token = issue_token(&state.tokens, "Laura Gómez", Duration::hours(1));

        Self {
            router: build_router(state.clone()),
            store,
            state,
            token,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn table_path(table: &str) -> String {
        format!("/v0/{}/{}", BASE_ID, table)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::COOKIE, format!("auth_token={}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request carrying a valid session cookie
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Request with a raw, unparsed body
    pub async fn request_raw(&self, method: Method, uri: &str, raw: &'static str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("auth_token={}", self.token()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub fn issue_token(verifier: &TokenVerifier, nombre: &str, ttl: Duration) -> String {
    verifier
        .issue(&SessionClaims::new(nombre, ttl))
        .expect("failed to issue token")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

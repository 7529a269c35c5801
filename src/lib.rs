//! DataLab API Library
//!
//! HTTP backend of the laboratory inventory: a session gate in front of
//! handlers that validate requests and forward them to the hosted record store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod record_store;
pub mod tracing;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::auth::{access_gate_middleware, AccessGate, SessionState, TokenVerifier};
use crate::config::AppConfig;
use crate::handlers::{
    entrada_insumos, equipo, status::root_status, stock_insumos, RecordStoreState,
};
use crate::middleware_helpers::request_id_middleware;
use crate::record_store::{RecordStoreClient, RecordStoreError};

// App state definition
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub record_store: RecordStoreClient,
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    /// Builds the shared clients once at startup
    pub fn new(config: AppConfig) -> Result<Self, RecordStoreError> {
        let record_store = RecordStoreClient::new(config.record_store.clone())?;
        let tokens = Arc::new(TokenVerifier::new(&config.jwt_secret));
        Ok(Self {
            config: Arc::new(config),
            record_store,
            tokens,
        })
    }
}

impl RecordStoreState for AppState {
    fn record_store(&self) -> &RecordStoreClient {
        &self.record_store
    }
}

impl SessionState for AppState {
    fn token_verifier(&self) -> &TokenVerifier {
        &self.tokens
    }
}

/// Routes under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/verify", get(auth::verify_session::<AppState>))
        .route(
            "/api/entrada-insumos",
            get(entrada_insumos::list_entries::<AppState>)
                .post(entrada_insumos::create_entries::<AppState>),
        )
        .route(
            "/api/stock-insumos",
            get(stock_insumos::list_stock::<AppState>)
                .post(stock_insumos::create_supply_item::<AppState>),
        )
        .route(
            "/api/equipo",
            get(equipo::list_responsables::<AppState>),
        )
}

/// Full application router: every route sits behind the access gate, with
/// request ids assigned before anything else runs.
pub fn build_router(state: AppState) -> Router {
    let gate = Arc::new(AccessGate::new(
        state.tokens.clone(),
        state.config.public_paths(),
    ));

    Router::new()
        .route("/", get(root_status))
        .merge(api_routes())
        .layer(from_fn_with_state(gate, access_gate_middleware))
        .layer(crate::tracing::configure_http_tracing())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

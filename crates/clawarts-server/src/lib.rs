pub mod api;
pub mod board;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod store;

use std::sync::Arc;

use axum::http::{header, HeaderName, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::auth::SYNC_KEY_HEADER;
use crate::board::Board;
use crate::cache::BoardCache;
use crate::config::AppConfig;
use crate::db::Archive;
use crate::ledger::{Ledger, LedgerSettings};
use crate::store::Store;

pub use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub board: Board,
    pub archive: Archive,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire services over an opened store
    pub fn new(config: AppConfig, store: Store, archive: Archive) -> AppResult<Self> {
        let settings = LedgerSettings::from_config(&config.settlement, config.round.duration_ms())
            .map_err(|e| AppError::Config(e.to_string()))?;
        let cache = BoardCache::new(&config.cache);

        Ok(Self {
            ledger: Ledger::new(store.clone(), settings),
            board: Board::new(store, cache),
            archive,
            config: Arc::new(config),
        })
    }

    /// In-memory state with the archive disabled
    pub fn in_memory(config: AppConfig) -> AppResult<Self> {
        Self::new(config, Store::in_memory(), Archive::disabled())
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(api::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SYNC_KEY_HEADER)]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

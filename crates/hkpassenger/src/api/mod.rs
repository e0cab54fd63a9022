//! REST API over the passenger flow store.
//!
//! Routes:
//!
//! - `GET  /HKPassenger/v1/data/:year/:month/:day?num=N` - paired records for a run of days
//! - `GET  /HKPassenger/v1/aggregate/:group/:year/:month` - net flow per day of a month
//! - `GET  /HKPassenger/v1/aggregate/:group/:year` - net flow per month of a year
//! - `POST /HKPassenger/v1/data/` - bulk insert of new days
//!
//! Anything else is answered with 400.

mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::config::ApiConfig;
use crate::store::FlowStore;

pub use error::{ApiError, DATABASE_ERROR};
pub use handlers::RangeParams;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The record store, built once at startup.
    pub store: Arc<dyn FlowStore>,
    /// Request validation limits.
    pub limits: ApiConfig,
}

impl AppState {
    /// Create state from a store and limits.
    #[must_use]
    pub fn new(store: Arc<dyn FlowStore>, limits: ApiConfig) -> Self {
        Self { store, limits }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/HKPassenger/v1/data/:year/:month/:day",
            get(handlers::read_range).fallback(handlers::unmatched),
        )
        .route(
            "/HKPassenger/v1/data/",
            post(handlers::write_bulk).fallback(handlers::unmatched),
        )
        .route(
            "/HKPassenger/v1/data",
            post(handlers::write_bulk).fallback(handlers::unmatched),
        )
        .route(
            "/HKPassenger/v1/aggregate/:group/:year/:month",
            get(handlers::aggregate_month).fallback(handlers::unmatched),
        )
        .route(
            "/HKPassenger/v1/aggregate/:group/:year",
            get(handlers::aggregate_year).fallback(handlers::unmatched),
        )
        .fallback(handlers::unmatched)
        .with_state(state)
}

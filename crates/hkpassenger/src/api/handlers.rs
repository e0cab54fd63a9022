//! Request handlers for the `/HKPassenger/v1` routes.

use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Method, Uri};
use axum::Json;
use tracing::debug;

use crate::aggregator::{self, AggregateQuery, AggregateRow};
use crate::params::ParamError;
use crate::reader::{self, RangeQuery};
use crate::record::FlowRecord;
use crate::writer::{self, BulkReport};

use super::error::ApiError;
use super::AppState;

/// Query string of the range read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RangeParams {
    /// Number of consecutive days, defaulting to 1.
    pub num: Option<String>,
}

impl RangeParams {
    /// Pick parameters out of decoded query pairs. A repeated key keeps its
    /// first value.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let num = pairs
            .into_iter()
            .find_map(|(key, value)| (key == "num").then_some(value));
        Self { num }
    }
}

/// `GET /HKPassenger/v1/data/:year/:month/:day?num=N`
pub async fn read_range(
    State(state): State<AppState>,
    path: Result<Path<(String, String, String)>, PathRejection>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<FlowRecord>>, ApiError> {
    let Path((year, month, day)) = path.map_err(|rejection| {
        debug!("Rejected range read path: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    })?;
    let Query(pairs) = query.map_err(|rejection| {
        debug!("Rejected range read query: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    })?;
    let params = RangeParams::from_pairs(pairs);

    let query = RangeQuery::parse(&year, &month, &day, params.num.as_deref(), &state.limits)
        .map_err(|err| {
            debug!("Rejected range read {}/{}/{}: {}", year, month, day, err);
            ApiError::bad_request(err.to_string())
        })?;

    let records = reader::read_range(state.store.as_ref(), &query).await?;
    Ok(Json(records))
}

/// `GET /HKPassenger/v1/aggregate/:group/:year/:month`
pub async fn aggregate_month(
    State(state): State<AppState>,
    path: Result<Path<(String, String, String)>, PathRejection>,
    uri: Uri,
) -> Result<Json<Vec<AggregateRow>>, ApiError> {
    let Path((group, year, month)) = path.map_err(|rejection| unreadable_path(&uri, &rejection))?;
    let query = AggregateQuery::daily(&group, &year, &month, &state.limits)
        .map_err(|err| rejected(&uri, &err))?;
    let rows = aggregator::aggregate(state.store.as_ref(), &query).await?;
    Ok(Json(rows))
}

/// `GET /HKPassenger/v1/aggregate/:group/:year`
pub async fn aggregate_year(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    uri: Uri,
) -> Result<Json<Vec<AggregateRow>>, ApiError> {
    let Path((group, year)) = path.map_err(|rejection| unreadable_path(&uri, &rejection))?;
    let query = AggregateQuery::monthly(&group, &year, &state.limits)
        .map_err(|err| rejected(&uri, &err))?;
    let rows = aggregator::aggregate(state.store.as_ref(), &query).await?;
    Ok(Json(rows))
}

/// `POST /HKPassenger/v1/data/`
pub async fn write_bulk(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BulkReport>, ApiError> {
    let payload = writer::parse_payload(&body).map_err(|err| {
        debug!("Rejected bulk insert: {}", err);
        ApiError::bad_request(err.to_string())
    })?;

    let report = writer::write_bulk(state.store.as_ref(), payload).await?;
    Ok(Json(report))
}

/// Fallback for unknown routes and methods.
pub async fn unmatched(method: Method, uri: Uri) -> ApiError {
    debug!("No route for {} {}", method, uri.path());
    ApiError::bad_request(format!("Cannot {method} {}", uri.path()))
}

fn rejected(uri: &Uri, err: &ParamError) -> ApiError {
    debug!("Rejected aggregate {}: {}", uri.path(), err);
    ApiError::bad_request(format!("Cannot GET {} - {err}", uri.path()))
}

fn unreadable_path(uri: &Uri, rejection: &PathRejection) -> ApiError {
    debug!("Rejected aggregate {}: {}", uri.path(), rejection.body_text());
    ApiError::bad_request(format!("Cannot GET {} - {}", uri.path(), rejection.body_text()))
}

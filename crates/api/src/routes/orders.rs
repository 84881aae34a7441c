//! Order placement, lookup and shipment-status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use checkout::PlacedOrder;
use common::{OrderId, UserId};
use domain::{Money, Order, OrderDetails, PlaceOrder, UpdateShipmentStatus};
use serde::{Deserialize, Serialize};
use store::CommerceStore;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the authenticated buyer's id.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Deserialize)]
pub struct PointsQuery {
    pub total: i64,
}

#[derive(Serialize)]
pub struct PointsResponse {
    pub total: i64,
    pub points: i64,
}

/// POST /orders: place an order for the buyer in `x-user-id`, or a guest.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn place<S: CommerceStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    payload: Result<Json<PlaceOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let buyer = buyer_from_headers(&headers)?;
    let Json(command) = payload?;

    let placed = state.orchestrator.place_order(command, buyer).await?;

    Ok((StatusCode::CREATED, Json(placed)))
}

/// GET /orders/{id}: load an order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: CommerceStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;

    Ok(Json(state.orchestrator.get_order(order_id).await?))
}

/// GET /orders/points?total=N: points a purchase of `N` would earn.
pub async fn points<S: CommerceStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<PointsQuery>, QueryRejection>,
) -> Result<Json<PointsResponse>, ApiError> {
    let Query(PointsQuery { total }) = query?;
    if total < 0 {
        return Err(ApiError::BadRequest(format!(
            "total must not be negative: {total}"
        )));
    }

    Ok(Json(PointsResponse {
        total,
        points: state.orchestrator.preview_points(Money::new(total)),
    }))
}

/// POST /orders/shipment-status: shipping partner status callback.
#[tracing::instrument(skip(state, payload))]
pub async fn shipment_status<S: CommerceStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<UpdateShipmentStatus>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(update) = payload?;

    Ok(Json(state.orchestrator.update_shipment_status(update).await?))
}

/// Reads the optional buyer id. A present but malformed header is rejected
/// rather than treated as a guest.
fn buyer_from_headers(headers: &HeaderMap) -> Result<Option<UserId>, ApiError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|text| text.trim().parse::<UserId>().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER} header")))
}

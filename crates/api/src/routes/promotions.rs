//! Promotion preview endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{Money, Promotion, PromotionKind, PromotionTarget};
use serde::Serialize;
use store::CommerceStore;

use crate::AppState;
use crate::error::ApiError;

/// Public description of a usable promotion.
#[derive(Debug, Serialize)]
pub struct PromotionValueResponse {
    pub code: String,
    pub name: String,
    pub description: String,
    pub kind: PromotionKind,
    pub target: PromotionTarget,
    pub value: i64,
    pub max_value: Option<Money>,
}

impl From<Promotion> for PromotionValueResponse {
    fn from(promotion: Promotion) -> Self {
        Self {
            code: promotion.code,
            name: promotion.name,
            description: promotion.description,
            kind: promotion.kind,
            target: promotion.target,
            value: promotion.value,
            max_value: promotion.max_value,
        }
    }
}

/// GET /promotions/{code}/value: validate a code without redeeming it.
#[tracing::instrument(skip(state))]
pub async fn value<S: CommerceStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<PromotionValueResponse>, ApiError> {
    let promotion = state.orchestrator.preview_promotion(code.trim()).await?;
    Ok(Json(promotion.into()))
}

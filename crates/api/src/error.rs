//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use serde::Serialize;

/// Code returned for malformed requests that never reach checkout.
const INVALID_REQUEST: &str = "order-007";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be parsed.
    BadRequest(String),
    /// Checkout rejected or failed the operation.
    Checkout(CheckoutError),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: INVALID_REQUEST,
                    message,
                },
            ),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, ErrorBody) {
    let status = match &err {
        CheckoutError::OrderNotFound(_)
        | CheckoutError::BuyerNotFound(_)
        | CheckoutError::PromotionNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::ProductUnavailable(_)
        | CheckoutError::InsufficientPoints { .. }
        | CheckoutError::PointRedemptionBelowMinimum { .. }
        | CheckoutError::Undeliverable
        | CheckoutError::InvalidRequest(_)
        | CheckoutError::PromotionExpired(_)
        | CheckoutError::PromotionExhausted(_) => StatusCode::BAD_REQUEST,
        CheckoutError::Shipping(_) | CheckoutError::Store(_) => {
            tracing::error!(error = %err, "internal server error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: err.code(),
                    message: "Internal server error".to_string(),
                },
            );
        }
    };

    (
        status,
        ErrorBody {
            error: err.code(),
            message: err.to_string(),
        },
    )
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

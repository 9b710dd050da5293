//! Error types for the storefront API.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError ──► CoreError ─┐                                      │
//! │                                 ├──► ApiError ──► (status, JSON body)  │
//! │  DbError ───────────────────────┤                                      │
//! │  PaymentError / extractor rejections ┘                                 │
//! │                                                                         │
//! │  Body: { "code": "NOT_FOUND", "message": "...", "details": [...]? }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their cause and answered with a
//! generic message.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

use jewel_core::{CoreError, ValidationError};
use jewel_db::DbError;

use crate::payments::PaymentError;

/// One offending input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// JSON error body.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub details: Option<Vec<FieldIssue>>,
}

/// Storefront API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldIssue>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{entity} not found")]
    NotFound { entity: String, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Payment not verified: {0}")]
    PaymentNotVerified(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Payments are not configured")]
    PaymentsUnavailable,

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PaymentNotVerified(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::InsufficientStock { .. } => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::PaymentsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ApiError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ApiError::PaymentNotVerified(_) => "PAYMENT_NOT_VERIFIED",
            ApiError::PaymentGateway(_) => "PAYMENT_GATEWAY_ERROR",
            ApiError::PaymentsUnavailable => "PAYMENTS_NOT_CONFIGURED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Internal(cause) => error!(cause = %cause, "Request failed"),
            ApiError::PaymentGateway(cause) => error!(cause = %cause, "Payment gateway failed"),
            _ => {}
        }

        let details = match &self {
            ApiError::Validation { details, .. } => Some(details.clone()),
            _ => None,
        };

        let body = ErrorBody {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            message: "Invalid request data".to_string(),
            details: vec![FieldIssue {
                field: err.field().to_string(),
                message: err.to_string(),
            }],
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => v.into(),
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::BillNotFound(id) => ApiError::not_found("Bill", id),
            CoreError::InsufficientStock {
                product,
                available,
                requested,
            } => ApiError::InsufficientStock {
                product,
                available,
                requested,
            },
            CoreError::TotalsMismatch { ref field, .. } => ApiError::Validation {
                message: "Invalid bill data".to_string(),
                details: vec![FieldIssue {
                    field: field.clone(),
                    message: err.to_string(),
                }],
            },
            CoreError::DiscountExceedsTotal { .. } => ApiError::Validation {
                message: "Invalid bill data".to_string(),
                details: vec![FieldIssue {
                    field: "discount".to_string(),
                    message: err.to_string(),
                }],
            },
            CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::AmountOverflow(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            DbError::UniqueViolation { field, .. } => {
                ApiError::Conflict(format!("Duplicate {}", field))
            }
            DbError::InsufficientStock {
                product,
                available,
                requested,
            } => ApiError::InsufficientStock {
                product,
                available,
                requested,
            },
            DbError::ForeignKeyViolation { message } => ApiError::BadRequest(format!(
                "Referenced record does not exist ({})",
                message
            )),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured => ApiError::PaymentsUnavailable,
            PaymentError::NotFound(id) => ApiError::PaymentNotVerified(format!("unknown payment {}", id)),
            other => ApiError::PaymentGateway(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request data: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_carries_details() {
        let err: ApiError = ValidationError::Required {
            field: "customerName".to_string(),
        }
        .into();

        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"][0]["field"], "customerName");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let (status, body) = body_json(ApiError::internal("disk I/O error at page 7")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_db_error_mapping() {
        assert_eq!(
            ApiError::from(DbError::not_found("Product", "p1")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::duplicate("email", "a@b.in")).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DbError::PoolExhausted).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_error_mapping() {
        let stock = CoreError::InsufficientStock {
            product: "Jhumka".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(ApiError::from(stock).status_code(), StatusCode::CONFLICT);

        let mismatch = CoreError::TotalsMismatch {
            field: "total".to_string(),
            expected: "10.00".to_string(),
            actual: "9.00".to_string(),
        };
        assert_eq!(ApiError::from(mismatch).status_code(), StatusCode::BAD_REQUEST);
    }
}

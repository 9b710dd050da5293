//! Card payment setup.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use jewel_core::ValidationError;

use crate::dto::{PaymentIntentRequest, PaymentIntentResponse};
use crate::error::{ApiError, ApiResult};
use crate::payments::CreateIntent;
use crate::state::AppState;

/// `POST /api/create-payment-intent`
///
/// ## Request
/// `{ "amount": "45999.50", "currency": "INR", "items": [...] }`, with the
/// amount in major units.
///
/// ## Response
/// - `200 OK` - `{ clientSecret }`
/// - `400 Bad Request` - amount not positive or too precise
/// - `502 Bad Gateway` - Stripe failed
/// - `503 Service Unavailable` - no Stripe key configured
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<PaymentIntentRequest>, JsonRejection>,
) -> ApiResult<Json<PaymentIntentResponse>> {
    let Json(req) = payload?;

    let amount = req.amount.to_money("amount", req.currency)?;
    if amount.minor_units() <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    let intent = state
        .payments()?
        .create_intent(CreateIntent {
            amount,
            currency: req.currency,
            items: req.items,
        })
        .await?;

    info!(
        payment_intent = %intent.id,
        amount = %amount.display(req.currency),
        "Payment intent created"
    );

    let client_secret = intent
        .client_secret
        .ok_or_else(|| ApiError::PaymentGateway("intent has no client secret".to_string()))?;

    Ok(Json(PaymentIntentResponse { client_secret }))
}

//! Storefront checkout.
//!
//! Orders are bills with the `ORD` prefix. Lines come from the live catalog
//! at catalog prices; the client only chooses products and quantities.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{info, warn};

use jewel_core::billing::{compute_totals, price_lines};
use jewel_core::{BillKind, Money, PaymentMethod, ValidationError};
use jewel_db::NewBill;

use crate::dto::{BillDto, CreateOrderRequest, OrderDto};
use crate::error::{ApiError, ApiResult};
use crate::handlers::bills::{totals_input, validate_customer};
use crate::handlers::cart::build_cart;
use crate::state::AppState;

/// `POST /api/orders`
///
/// - `201 Created` - `{ id, orderNumber, ...bill }`
/// - `400 Bad Request` - invalid customer, lines or totals, or an
///   unverified card payment
/// - `404 Not Found` - a product is unknown or no longer sold
/// - `409 Conflict` - stock ran out, or the payment already settled an order
/// - `503 Service Unavailable` - card order with payments unconfigured
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderDto>)> {
    let Json(req) = payload?;
    let currency = req.currency;

    let customer = validate_customer(req.customer)?;
    let cart = build_cart(&state, currency, &req.items).await?;
    let lines = price_lines(cart.into_line_drafts())?;

    let mut input = totals_input(&req.amounts, currency)?;
    let mut payment_reference = None;

    if req.payment_method == PaymentMethod::Card {
        let intent_id = req
            .payment_intent_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "paymentIntentId".to_string(),
            })?;
        if !is_payment_intent_id(intent_id) {
            return Err(ValidationError::InvalidFormat {
                field: "paymentIntentId".to_string(),
                reason: "expected pi_ followed by letters, digits or underscores".to_string(),
            }
            .into());
        }

        // Totals without the paid amount; a card order is paid in full
        input.paid_amount = Money::zero();
        let expected = compute_totals(&lines, currency, &state.config.tax_rates, &input)?;

        let intent = state.payments()?.retrieve_intent(intent_id).await?;
        if intent.id != intent_id {
            warn!(payment_intent = %intent_id, returned = %intent.id, "Gateway returned another object");
            return Err(ApiError::PaymentNotVerified(
                "payment reference does not match".to_string(),
            ));
        }
        if let Err(reason) = intent.verify(expected.total, currency) {
            warn!(payment_intent = %intent_id, %reason, "Card payment rejected");
            return Err(ApiError::PaymentNotVerified(reason));
        }

        input.paid_amount = expected.total;
        payment_reference = Some(intent.id);
    }

    let totals = compute_totals(&lines, currency, &state.config.tax_rates, &input)?;

    let now = Utc::now();
    let bill = state
        .db
        .bills()
        .create(
            NewBill {
                kind: BillKind::Order,
                customer_name: customer.customer_name,
                customer_email: customer.customer_email,
                customer_phone: customer.customer_phone,
                customer_address: customer.customer_address,
                currency,
                lines,
                totals,
                payment_method: req.payment_method,
                payment_reference,
            },
            state.store_day(now),
            now,
        )
        .await?;

    info!(
        order_number = %bill.bill_number,
        total = %totals.total.display(currency),
        method = ?bill.payment_method,
        "Order placed"
    );

    Ok((
        StatusCode::CREATED,
        Json(OrderDto {
            order_number: bill.bill_number.clone(),
            bill: BillDto::from(&bill),
        }),
    ))
}

/// `pi_` followed by at least one ASCII letter, digit or underscore.
fn is_payment_intent_id(id: &str) -> bool {
    id.strip_prefix("pi_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pi_3NqLk2Abc_secret", true)]
    #[case("pi_stub_7", true)]
    #[case("pi_", false)]
    #[case("ch_3NqLk2Abc", false)]
    #[case("../charges/ch_A", false)]
    #[case("pi_A/../../charges/ch_A", false)]
    #[case("pi_A%2F", false)]
    fn test_is_payment_intent_id(#[case] id: &str, #[case] expected: bool) {
        assert_eq!(is_payment_intent_id(id), expected);
    }
}

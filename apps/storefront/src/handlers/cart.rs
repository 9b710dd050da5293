//! Cart pricing.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::debug;

use jewel_core::cart::Cart;
use jewel_core::validation::validate_cart_lines;
use jewel_core::{CoreError, Currency, Product, ValidationError};

use crate::dto::{CartLineRequest, CartQuote, CartQuoteRequest};
use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /api/cart/quote`
///
/// Prices the browser's cart against the live catalog.
///
/// - `200 OK` - lines, subtotal, GST/VAT at the configured rate, total
/// - `404 Not Found` - a product is unknown or no longer sold
/// - `409 Conflict` - a quantity exceeds stock
pub async fn quote_cart(
    State(state): State<AppState>,
    payload: Result<Json<CartQuoteRequest>, JsonRejection>,
) -> ApiResult<Json<CartQuote>> {
    let Json(req) = payload?;

    let cart = build_cart(&state, req.currency, &req.items).await?;
    let totals = cart.totals(state.config.tax_rates.for_currency(cart.currency));

    debug!(
        lines = totals.item_count,
        subtotal = totals.subtotal.minor_units(),
        currency = %cart.currency,
        "Cart quoted"
    );
    Ok(Json(CartQuote::new(&cart, &totals)))
}

/// Loads each product once and adds the lines to a fresh cart.
pub(crate) async fn build_cart(
    state: &AppState,
    currency: Currency,
    lines: &[CartLineRequest],
) -> ApiResult<Cart> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }
    validate_cart_lines(lines.len())?;

    let repo = state.db.products();
    let mut products: HashMap<&str, Product> = HashMap::new();
    for line in lines {
        let id = line.product_id.as_str();
        if products.contains_key(id) {
            continue;
        }
        let product = repo
            .get_active(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;
        products.insert(id, product);
    }

    let mut cart = Cart::new(currency);
    for line in lines {
        if let Some(product) = products.get(line.product_id.as_str()) {
            cart.add_item(product, line.quantity)?;
        }
    }

    Ok(cart)
}

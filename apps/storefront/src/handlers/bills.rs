//! Counter billing handlers (admin only).
//!
//! ## Create Flow
//! ```text
//! POST /api/bills
//!   │
//!   ├── customer fields ────────► validation (400)
//!   ├── items ──► catalog lookup (404) ──► name/price defaults
//!   ├── price_lines + compute_totals ───► totals checks (400)
//!   ▼
//! BillRepository::create  (one transaction)
//!   ├── PJ/{day}-{n} from the per-day sequence
//!   ├── bill + items
//!   └── stock decrement (409 when short)
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use tracing::{debug, info};

use jewel_core::billing::{compute_totals, price_lines, BillNumber, LineDraft, TotalsInput};
use jewel_core::validation::{
    validate_address, validate_email, validate_person_name, validate_phone, validate_search_query,
};
use jewel_core::{BillKind, CoreError, Currency, ValidationError};
use jewel_db::{DateRange, NewBill};

use crate::auth::AdminUser;
use crate::dto::{
    amount_opt, amount_or_zero, AmountsInput, BillDto, BillItemRequest, BillListQuery,
    CreateBillRequest, CustomerInput, InvoiceQuery,
};
use crate::error::{ApiError, ApiResult};
use crate::invoice::{invoice_file_name, render_invoice};
use crate::state::AppState;

/// `GET /api/bills?search=&startDate=&endDate=`
///
/// - `search` matches bill number, customer name or email; a complete bill
///   number finds only that bill
/// - `startDate`/`endDate` (`YYYY-MM-DD`, inclusive, store timezone) need
///   each other; with only one given the full list is returned
/// - newest first
pub async fn list_bills(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    query: Result<Query<BillListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<BillDto>>> {
    let Query(query) = query?;
    let bills = state.db.bills();

    let search = validate_search_query(query.search.as_deref().unwrap_or_default())?;

    let found = if !search.is_empty() {
        match search.to_ascii_uppercase().parse::<BillNumber>() {
            // LIKE would also match PJ/20240315-1000 for PJ/20240315-100
            Ok(number) => bills
                .get_by_number(&number.to_string())
                .await?
                .into_iter()
                .collect::<Vec<_>>(),
            Err(_) => bills.search(&search).await?,
        }
    } else if let (Some(start), Some(end)) = (query.start_date.as_deref(), query.end_date.as_deref()) {
        let range = day_range(start, end, state.config.store.utc_offset_minutes)?;
        bills.list_between(range).await?
    } else {
        bills.list_all().await?
    };

    debug!(count = found.len(), "Listed bills");
    Ok(Json(found.iter().map(BillDto::from).collect()))
}

/// `GET /api/bills/{id}`
pub async fn get_bill(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<BillDto>> {
    let bill = state
        .db
        .bills()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::BillNotFound(id.clone()))?;

    Ok(Json(BillDto::from(&bill)))
}

/// `POST /api/bills` - `201 Created` with the numbered bill.
pub async fn create_bill(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<CreateBillRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BillDto>)> {
    let Json(req) = payload?;
    let currency = req.currency;

    let customer = validate_customer(req.customer)?;
    let drafts = bill_lines(&state, currency, req.items).await?;
    let lines = price_lines(drafts)?;

    let input = totals_input(&req.amounts, currency)?;
    let totals = compute_totals(&lines, currency, &state.config.tax_rates, &input)?;

    let now = Utc::now();
    let bill = state
        .db
        .bills()
        .create(
            NewBill {
                kind: BillKind::Bill,
                customer_name: customer.customer_name,
                customer_email: customer.customer_email,
                customer_phone: customer.customer_phone,
                customer_address: customer.customer_address,
                currency,
                lines,
                totals,
                payment_method: req.payment_method,
                payment_reference: None,
            },
            state.store_day(now),
            now,
        )
        .await?;

    info!(
        bill_number = %bill.bill_number,
        total = %bill.totals().total.display(currency),
        by = %admin.email,
        "Counter bill issued"
    );
    Ok((StatusCode::CREATED, Json(BillDto::from(&bill))))
}

/// `GET /api/bills/{id}/pdf?copy=customer|store`
pub async fn get_bill_pdf(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    query: Result<Query<InvoiceQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;

    let bill = state
        .db
        .bills()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::BillNotFound(id.clone()))?;

    let file_name = invoice_file_name(&bill);
    let config = state.config.clone();

    let rendered = tokio::task::spawn_blocking(move || {
        render_invoice(
            &bill,
            &config.store,
            config.logo_path.as_deref(),
            query.copy,
            Utc::now(),
        )
    })
    .await
    .map_err(|e| ApiError::internal(format!("Invoice task failed: {}", e)))?
    .map_err(|e| ApiError::internal(e.to_string()))?;

    debug!(file = %file_name, pages = rendered.pages, "Invoice served");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        rendered.bytes,
    )
        .into_response())
}

// =============================================================================
// Shared with orders
// =============================================================================

/// Validates and trims the customer block.
pub(crate) fn validate_customer(input: CustomerInput) -> Result<CustomerInput, ValidationError> {
    let customer = CustomerInput {
        customer_name: input.customer_name.trim().to_string(),
        customer_email: input.customer_email.trim().to_lowercase(),
        customer_phone: input.customer_phone.trim().to_string(),
        customer_address: input.customer_address.trim().to_string(),
    };

    validate_person_name("customerName", &customer.customer_name)?;
    validate_email(&customer.customer_email).map_err(|e| e.with_field("customerEmail"))?;
    validate_phone(&customer.customer_phone)?;
    validate_address(&customer.customer_address)?;

    Ok(customer)
}

/// Parses the money fields of a bill or order.
pub(crate) fn totals_input(
    amounts: &AmountsInput,
    currency: Currency,
) -> Result<TotalsInput, ValidationError> {
    Ok(TotalsInput {
        making_charges: amount_or_zero(&amounts.making_charges, "makingCharges", currency)?,
        tax: amount_opt(&amounts.tax, "tax", currency)?,
        discount: amount_or_zero(&amounts.discount, "discount", currency)?,
        paid_amount: amount_or_zero(&amounts.paid_amount, "paidAmount", currency)?,
        claimed_subtotal: amount_opt(&amounts.subtotal, "subtotal", currency)?,
        claimed_total: amount_opt(&amounts.total, "total", currency)?,
    })
}

/// Resolves counter-bill lines. Catalog lines default their name and price
/// from the product; free-text lines must carry both.
async fn bill_lines(
    state: &AppState,
    currency: Currency,
    items: Vec<BillItemRequest>,
) -> ApiResult<Vec<LineDraft>> {
    let products = state.db.products();
    let mut drafts = Vec::with_capacity(items.len());

    for (i, item) in items.into_iter().enumerate() {
        let unit_price = amount_opt(&item.unit_price, &format!("items[{}].unitPrice", i), currency)?;
        let name = item
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let draft = match item.product_id.filter(|id| !id.trim().is_empty()) {
            Some(product_id) => {
                let product = products
                    .get_active(&product_id)
                    .await?
                    .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
                LineDraft {
                    product_name: name.unwrap_or_else(|| product.name.clone()),
                    unit_price: unit_price.unwrap_or_else(|| product.price(currency)),
                    product_id: Some(product_id),
                    quantity: item.quantity,
                }
            }
            None => LineDraft {
                product_id: None,
                product_name: name.ok_or_else(|| ValidationError::Required {
                    field: format!("items[{}].productName", i),
                })?,
                unit_price: unit_price.ok_or_else(|| ValidationError::Required {
                    field: format!("items[{}].unitPrice", i),
                })?,
                quantity: item.quantity,
            },
        };
        drafts.push(draft);
    }

    Ok(drafts)
}

/// Inclusive store-local days → half-open UTC range.
fn day_range(start: &str, end: &str, utc_offset_minutes: i32) -> Result<DateRange, ValidationError> {
    let parse = |field: &str, raw: &str| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        })
    };
    let start_day = parse("startDate", start)?;
    let end_day = parse("endDate", end)?;

    if end_day < start_day {
        return Err(ValidationError::InvalidFormat {
            field: "endDate".to_string(),
            reason: "must not be before startDate".to_string(),
        });
    }

    let invalid_offset = || ValidationError::InvalidFormat {
        field: "startDate".to_string(),
        reason: "outside the supported calendar".to_string(),
    };
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(invalid_offset)?;
    let local_midnight = |day: NaiveDate| {
        day.and_hms_opt(0, 0, 0)
            .and_then(|dt| offset.from_local_datetime(&dt).single())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(invalid_offset)
    };

    Ok(DateRange::new(
        local_midnight(start_day)?,
        local_midnight(end_day + Duration::days(1))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_range_uses_store_offset() {
        let range = day_range("2024-03-15", "2024-03-15", 330).unwrap();

        assert_eq!(range.start.to_rfc3339(), "2024-03-14T18:30:00+00:00");
        assert_eq!(range.end.to_rfc3339(), "2024-03-15T18:30:00+00:00");
    }

    #[test]
    fn test_day_range_rejects_bad_input() {
        assert_eq!(day_range("15/03/2024", "2024-03-15", 0).unwrap_err().field(), "startDate");
        assert_eq!(day_range("2024-03-15", "2024-03-14", 0).unwrap_err().field(), "endDate");
    }

    #[test]
    fn test_validate_customer_trims_and_checks() {
        let ok = validate_customer(CustomerInput {
            customer_name: "  Asha Raman ".to_string(),
            customer_email: " Asha@Example.IN ".to_string(),
            customer_phone: "+91 98450 12345".to_string(),
            customer_address: "12 MG Road".to_string(),
        })
        .unwrap();
        assert_eq!(ok.customer_name, "Asha Raman");
        assert_eq!(ok.customer_email, "asha@example.in");

        let bad = validate_customer(CustomerInput {
            customer_email: "nope".to_string(),
            ..ok
        });
        assert_eq!(bad.unwrap_err().field(), "customerEmail");
    }
}

//! # API Data Transfer Objects
//!
//! JSON shapes exchanged with the browser clients. All keys are camelCase
//! and every money amount leaves the server as a fixed-point string in the
//! bill or product currency (`"1250.00"`, `"12.500"`).
//!
//! Requests accept amounts as either a JSON string or a JSON number; both
//! are parsed exactly against the currency's decimal places.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use jewel_core::cart::{Cart, CartTotals};
use jewel_core::types::format_weight_mg;
use jewel_core::{
    Bill, BillItem, BillKind, Category, Currency, Money, PaymentMethod, Product, Role, User,
    ValidationError,
};

// =============================================================================
// Amounts
// =============================================================================

/// A money amount as sent by a client.
#[derive(Debug, Clone, PartialEq, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum AmountInput {
    Text(String),
    Number(f64),
}

impl AmountInput {
    /// Parses into minor units of `currency`, labelling errors with `field`.
    pub fn to_money(&self, field: &str, currency: Currency) -> Result<Money, ValidationError> {
        let text = match self {
            AmountInput::Text(s) => s.clone(),
            AmountInput::Number(n) if n.is_finite() => n.to_string(),
            AmountInput::Number(_) => {
                return Err(ValidationError::InvalidFormat {
                    field: field.to_string(),
                    reason: "must be a finite number".to_string(),
                })
            }
        };
        Money::parse(&text, currency).map_err(|e| e.with_field(field))
    }
}

/// Parses an optional amount, defaulting to zero.
pub fn amount_or_zero(
    input: &Option<AmountInput>,
    field: &str,
    currency: Currency,
) -> Result<Money, ValidationError> {
    match input {
        Some(amount) => amount.to_money(field, currency),
        None => Ok(Money::zero()),
    }
}

/// Parses an optional amount, keeping absence.
pub fn amount_opt(
    input: &Option<AmountInput>,
    field: &str,
    currency: Currency,
) -> Result<Option<Money>, ValidationError> {
    input
        .as_ref()
        .map(|amount| amount.to_money(field, currency))
        .transpose()
}

// =============================================================================
// Common
// =============================================================================

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        UserDto {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct AuthResponse {
    pub user: UserDto,
    pub token: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub price_inr: String,
    pub price_bhd: String,
    /// Grams, three decimals
    pub gross_weight: Option<String>,
    pub net_weight: Option<String>,
    pub stock: i64,
    pub images: Vec<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductDto {
    fn from(p: &Product) -> Self {
        ProductDto {
            id: p.id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            category: p.category,
            price_inr: p.price(Currency::Inr).format(Currency::Inr),
            price_bhd: p.price(Currency::Bhd).format(Currency::Bhd),
            gross_weight: p.gross_weight_mg.map(format_weight_mg),
            net_weight: p.net_weight_mg.map(format_weight_mg),
            stock: p.stock,
            images: p.images.clone(),
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartQuoteRequest {
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub items: Vec<CartLineRequest>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartQuoteLine {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: String,
    pub line_total: String,
    pub available: i64,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartQuote {
    pub currency: Currency,
    pub items: Vec<CartQuoteLine>,
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: String,
    pub tax_label: String,
    pub tax: String,
    pub total: String,
}

impl CartQuote {
    pub fn new(cart: &Cart, totals: &CartTotals) -> Self {
        let currency = cart.currency;
        CartQuote {
            currency,
            items: cart
                .items
                .iter()
                .map(|item| CartQuoteLine {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.format(currency),
                    line_total: item.line_total().format(currency),
                    available: item.available,
                })
                .collect(),
            item_count: totals.item_count,
            total_quantity: totals.total_quantity,
            subtotal: totals.subtotal.format(currency),
            tax_label: currency.tax_label().to_string(),
            tax: totals.tax.format(currency),
            total: totals.total.format(currency),
        }
    }
}

fn default_currency() -> Currency {
    Currency::Inr
}

// =============================================================================
// Bills & Orders
// =============================================================================

/// Customer contact fields shared by bills and orders.
#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerInput {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
}

/// One counter-bill line. Catalog lines may omit name and price.
#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BillItemRequest {
    #[ts(optional)]
    pub product_id: Option<String>,
    #[ts(optional)]
    pub product_name: Option<String>,
    pub quantity: i64,
    #[ts(optional)]
    pub unit_price: Option<AmountInput>,
}

/// Money fields a bill or order may carry.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AmountsInput {
    #[ts(optional)]
    pub subtotal: Option<AmountInput>,
    #[ts(optional)]
    pub making_charges: Option<AmountInput>,
    /// Omitted: computed at the configured GST/VAT rate
    #[ts(optional)]
    pub tax: Option<AmountInput>,
    #[ts(optional)]
    pub discount: Option<AmountInput>,
    #[ts(optional)]
    pub total: Option<AmountInput>,
    #[ts(optional)]
    pub paid_amount: Option<AmountInput>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateBillRequest {
    #[serde(flatten)]
    pub customer: CustomerInput,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub items: Vec<BillItemRequest>,
    #[serde(flatten)]
    pub amounts: AmountsInput,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateOrderRequest {
    #[serde(flatten)]
    pub customer: CustomerInput,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub items: Vec<CartLineRequest>,
    #[serde(flatten)]
    pub amounts: AmountsInput,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Stripe PaymentIntent that paid a CARD order
    #[ts(optional)]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillListQuery {
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BillItemDto {
    pub id: String,
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: String,
    pub line_total: String,
}

impl BillItemDto {
    fn new(item: &BillItem, currency: Currency) -> Self {
        BillItemDto {
            id: item.id.clone(),
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price().format(currency),
            line_total: item.line_total().format(currency),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BillDto {
    pub id: String,
    pub bill_number: String,
    pub kind: BillKind,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub currency: Currency,
    pub subtotal: String,
    pub making_charges: String,
    /// "GST" or "VAT"
    pub tax_label: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
    pub paid_amount: String,
    pub balance_due: String,
    pub change_due: String,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub items: Vec<BillItemDto>,
}

impl From<&Bill> for BillDto {
    fn from(bill: &Bill) -> Self {
        let c = bill.currency;
        let totals = bill.totals();
        BillDto {
            id: bill.id.clone(),
            bill_number: bill.bill_number.clone(),
            kind: bill.kind,
            customer_name: bill.customer_name.clone(),
            customer_email: bill.customer_email.clone(),
            customer_phone: bill.customer_phone.clone(),
            customer_address: bill.customer_address.clone(),
            currency: c,
            subtotal: totals.subtotal.format(c),
            making_charges: totals.making_charges.format(c),
            tax_label: c.tax_label().to_string(),
            tax: totals.tax.format(c),
            discount: totals.discount.format(c),
            total: totals.total.format(c),
            paid_amount: totals.paid_amount.format(c),
            balance_due: totals.balance_due().format(c),
            change_due: totals.change_due().format(c),
            payment_method: bill.payment_method,
            payment_reference: bill.payment_reference.clone(),
            created_at: bill.created_at,
            items: bill.items.iter().map(|i| BillItemDto::new(i, c)).collect(),
        }
    }
}

/// A created storefront order: the bill plus its order number.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderDto {
    pub order_number: String,
    #[serde(flatten)]
    pub bill: BillDto,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    #[serde(default)]
    pub copy: crate::invoice::CopyKind,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentIntentRequest {
    /// Major units (rupees / dinars)
    pub amount: AmountInput,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    /// Cart snapshot stored on the intent
    #[serde(default)]
    #[ts(type = "unknown")]
    pub items: serde_json::Value,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AmountInput::Text("1234.5".to_string()), Currency::Inr, Some(123_450))]
    #[case(AmountInput::Number(1234.56), Currency::Inr, Some(123_456))]
    #[case(AmountInput::Number(12.345), Currency::Bhd, Some(12_345))]
    #[case(AmountInput::Number(12.345), Currency::Inr, None)]
    #[case(AmountInput::Text("abc".to_string()), Currency::Inr, None)]
    fn test_amount_input(#[case] input: AmountInput, #[case] currency: Currency, #[case] minor: Option<i64>) {
        let parsed = input.to_money("total", currency);
        match minor {
            Some(m) => assert_eq!(parsed.unwrap().minor_units(), m),
            None => assert_eq!(parsed.unwrap_err().field(), "total"),
        }
    }

    #[test]
    fn test_order_request_accepts_strings_and_numbers() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "customerName": "Asha",
            "customerEmail": "asha@example.in",
            "customerPhone": "9876543210",
            "customerAddress": "Chennai",
            "currency": "BHD",
            "items": [{ "productId": "p1", "quantity": 2 }],
            "total": 12.5,
            "paidAmount": "12.500",
            "paymentMethod": "CARD",
            "paymentIntentId": "pi_1"
        }))
        .unwrap();

        assert_eq!(req.currency, Currency::Bhd);
        assert_eq!(req.payment_method, PaymentMethod::Card);
        assert_eq!(req.amounts.total, Some(AmountInput::Number(12.5)));
        assert_eq!(req.amounts.paid_amount, Some(AmountInput::Text("12.500".to_string())));
        assert!(req.amounts.tax.is_none());
    }
}

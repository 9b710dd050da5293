//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Bill       │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  category       │   │  bill_number    │   │  email (unique) │       │
//! │  │  price_inr/bhd  │   │  currency       │   │  password_hash  │       │
//! │  │  weights, stock │   │  totals         │   │  role           │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ 1..n                                  │
//! │                        ┌────────▼────────┐                              │
//! │                        │    BillItem     │  snapshot of product         │
//! │                        │  name, qty,     │  data at sale time           │
//! │                        │  unit price     │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: `bill_number`, user `email`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{format_fixed, parse_fixed, Currency, Money};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 300 bps = 3% (GST on jewellery), 1000 bps = 10% (Bahrain VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Category
// =============================================================================

/// Catalog category. Closed set; the wire and database form is the
/// SCREAMING_SNAKE_CASE name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Category {
    Rings,
    NecklacesChains,
    Earrings,
    BraceletsBangles,
    PendantsLockets,
    Mangalsutra,
    NoseJewellery,
    AnkletsToeRings,
    BroochesPins,
    KidsJewellery,
    BridalCollections,
    MaterialGemstone,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Rings,
        Category::NecklacesChains,
        Category::Earrings,
        Category::BraceletsBangles,
        Category::PendantsLockets,
        Category::Mangalsutra,
        Category::NoseJewellery,
        Category::AnkletsToeRings,
        Category::BroochesPins,
        Category::KidsJewellery,
        Category::BridalCollections,
        Category::MaterialGemstone,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Rings => "RINGS",
            Category::NecklacesChains => "NECKLACES_CHAINS",
            Category::Earrings => "EARRINGS",
            Category::BraceletsBangles => "BRACELETS_BANGLES",
            Category::PendantsLockets => "PENDANTS_LOCKETS",
            Category::Mangalsutra => "MANGALSUTRA",
            Category::NoseJewellery => "NOSE_JEWELLERY",
            Category::AnkletsToeRings => "ANKLETS_TOE_RINGS",
            Category::BroochesPins => "BROOCHES_PINS",
            Category::KidsJewellery => "KIDS_JEWELLERY",
            Category::BridalCollections => "BRIDAL_COLLECTIONS",
            Category::MaterialGemstone => "MATERIAL_GEMSTONE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: Category::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Weight
// =============================================================================

/// Parses a gram weight such as `"12.5"` into milligrams.
pub fn parse_weight_mg(field: &str, input: &str) -> Result<i64, ValidationError> {
    let mg = parse_fixed(input, 3).map_err(|reason| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason,
    })?;
    if mg < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(mg)
}

/// Formats milligrams as grams with three decimals.
pub fn format_weight_mg(mg: i64) -> String {
    format_fixed(mg, 3)
}

// =============================================================================
// Product
// =============================================================================

/// A catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,

    pub description: String,

    pub category: Category,

    /// Price in paise.
    pub price_inr_minor: i64,

    /// Price in fils.
    pub price_bhd_minor: i64,

    /// Gross weight in milligrams.
    pub gross_weight_mg: Option<i64>,

    /// Net (metal) weight in milligrams; never above gross.
    pub net_weight_mg: Option<i64>,

    /// Units on hand.
    pub stock: i64,

    /// Ordered image URLs (`/uploads/...`).
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub images: Vec<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the list price in the given currency.
    #[inline]
    pub fn price(&self, currency: Currency) -> Money {
        match currency {
            Currency::Inr => Money::from_minor(self.price_inr_minor),
            Currency::Bhd => Money::from_minor(self.price_bhd_minor),
        }
    }

    /// Checks if there is enough stock to sell `quantity` units.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    /// Staff with catalog and billing access.
    Admin,
    /// Registered shopper.
    Guest,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    /// Stored lowercased.
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    /// Card, online through the payment gateway or on a counter terminal.
    Card,
    Upi,
    BankTransfer,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Bill
// =============================================================================

/// Where a bill came from. Selects the bill number prefix.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BillKind {
    /// Raised by staff at the counter.
    Bill,
    /// Placed through the storefront checkout.
    Order,
}

impl BillKind {
    /// Bill number prefix for this kind.
    pub const fn prefix(&self) -> &'static str {
        match self {
            BillKind::Bill => crate::BILL_PREFIX,
            BillKind::Order => crate::ORDER_PREFIX,
        }
    }
}

/// A finalized bill or order. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: String,
    /// `{PREFIX}/{YYYYMMDD}-{NNN}`
    pub bill_number: String,
    pub kind: BillKind,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub currency: Currency,
    pub subtotal_minor: i64,
    pub making_charges_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub total_minor: i64,
    pub paid_minor: i64,
    pub payment_method: PaymentMethod,
    /// Payment gateway reference (PaymentIntent id) when paid online.
    pub payment_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<BillItem>,
}

impl Bill {
    /// Returns the stored totals as Money.
    pub fn totals(&self) -> crate::billing::BillTotals {
        crate::billing::BillTotals {
            subtotal: Money::from_minor(self.subtotal_minor),
            making_charges: Money::from_minor(self.making_charges_minor),
            tax: Money::from_minor(self.tax_minor),
            discount: Money::from_minor(self.discount_minor),
            total: Money::from_minor(self.total_minor),
            paid_amount: Money::from_minor(self.paid_minor),
        }
    }
}

// =============================================================================
// Bill Item
// =============================================================================

/// A line item in a bill.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    /// Catalog product, when the line was sold from the catalog.
    pub product_id: Option<String>,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in the bill currency at time of sale (frozen).
    pub unit_price_minor: i64,
    /// unit_price × quantity.
    pub line_total_minor: i64,
}

impl BillItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_minor(self.unit_price_minor)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_minor(self.line_total_minor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Solitaire Ring".to_string(),
            description: String::new(),
            category: Category::Rings,
            price_inr_minor: 4_500_000,
            price_bhd_minor: 210_500,
            gross_weight_mg: Some(4_200),
            net_weight_mg: Some(3_900),
            stock: 2,
            images: vec![],
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(300);
        assert_eq!(rate.bps(), 300);
        assert!((rate.percentage() - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_product_price_per_currency() {
        let p = ring();
        assert_eq!(p.price(Currency::Inr).format(Currency::Inr), "45000.00");
        assert_eq!(p.price(Currency::Bhd).format(Currency::Bhd), "210.500");
    }

    #[test]
    fn test_can_sell() {
        let mut p = ring();
        assert!(p.can_sell(2));
        assert!(!p.can_sell(3));
        p.is_active = false;
        assert!(!p.can_sell(1));
    }

    #[test]
    fn test_category_round_trips_wire_name() {
        assert_eq!("NOSE_JEWELLERY".parse::<Category>().unwrap(), Category::NoseJewellery);
        assert_eq!("rings".parse::<Category>().unwrap(), Category::Rings);
        assert!("WATCHES".parse::<Category>().is_err());
        assert_eq!(
            serde_json::to_string(&Category::AnkletsToeRings).unwrap(),
            "\"ANKLETS_TOE_RINGS\""
        );
    }

    #[test]
    fn test_weights() {
        assert_eq!(parse_weight_mg("grossWeight", "12.5").unwrap(), 12_500);
        assert_eq!(format_weight_mg(12_500), "12.500");
        assert!(parse_weight_mg("grossWeight", "-1").is_err());
        assert!(parse_weight_mg("grossWeight", "1.2345").is_err());
    }

    #[test]
    fn test_bill_kind_prefix() {
        assert_eq!(BillKind::Bill.prefix(), "PJ");
        assert_eq!(BillKind::Order.prefix(), "ORD");
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"BANK_TRANSFER\""
        );
        let m: PaymentMethod = serde_json::from_str("\"UPI\"").unwrap();
        assert_eq!(m, PaymentMethod::Upi);
    }
}

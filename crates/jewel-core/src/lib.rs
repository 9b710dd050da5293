//! # jewel-core: Pure Business Logic for the Jewel Storefront
//!
//! This crate holds every pricing and numbering rule of the storefront as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Jewel Storefront Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Browser clients (storefront, admin panel)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/storefront (axum handlers)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ jewel-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  billing  │  │   cart    │  │   │
//! │  │   │  Product  │  │   Money   │  │ BillNumber│  │   Cart    │  │   │
//! │  │   │   Bill    │  │ Currency  │  │  Totals   │  │ CartLine  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    jewel-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Bill, User, etc.)
//! - [`money`] - Money and Currency with exact decimal parsing
//! - [`billing`] - Bill numbers and totals computation
//! - [`cart`] - Server-side cart pricing
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use jewel_core::money::{Currency, Money};
//! use jewel_core::types::TaxRate;
//!
//! let price = Money::parse("1234.50", Currency::Inr).unwrap();
//! assert_eq!(price.minor_units(), 123450);
//!
//! // 3% GST, rounded half-up in paise
//! let gst = price.calculate_tax(TaxRate::from_bps(300));
//! assert_eq!(gst.format(Currency::Inr), "37.04");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::{Currency, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart or bill.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Bill number prefix for counter bills raised by staff.
pub const BILL_PREFIX: &str = "PJ";

/// Bill number prefix for storefront orders.
pub const ORDER_PREFIX: &str = "ORD";

/// Default GST rate for INR bills (3%).
pub const DEFAULT_GST_RATE_BPS: u32 = 300;

/// Default VAT rate for BHD bills (10%).
pub const DEFAULT_VAT_RATE_BPS: u32 = 1000;

/// Default store timezone offset (IST, UTC+05:30) used to pick the bill day.
pub const DEFAULT_STORE_UTC_OFFSET_MINUTES: i32 = 330;

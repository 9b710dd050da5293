//! HTTP handlers, one module per resource.
//!
//! Handlers stay thin: extract, validate, call jewel-core / jewel-db,
//! map to DTOs. Errors travel as [`crate::error::ApiError`].

pub mod auth;
pub mod bills;
pub mod cart;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

pub use auth::{login, me, register};
pub use bills::{create_bill, get_bill, get_bill_pdf, list_bills};
pub use cart::quote_cart;
pub use health::health_check;
pub use orders::create_order;
pub use payments::create_payment_intent;
pub use products::{create_product, delete_product, get_product, list_products, update_product};

//! # Cart Pricing
//!
//! The browser owns the cart; the server prices it against the live
//! catalog before checkout so the customer never sees a stale total.
//!
//! ## Quote Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cart Quote                                      │
//! │                                                                         │
//! │  [(product_id, qty), ...] + currency                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load products (jewel-db)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Cart::add_item() per line ← THIS MODULE                               │
//! │       │   ├── same product twice → quantities merge                    │
//! │       │   ├── inactive product   → ProductNotFound                     │
//! │       │   ├── qty > stock        → InsufficientStock                   │
//! │       │   └── > 100 lines / qty > 999 → limits                         │
//! │       ▼                                                                 │
//! │  CartTotals { subtotal, tax (GST|VAT), total }                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::billing::LineDraft;
use crate::error::{CoreError, CoreResult};
use crate::money::{Currency, Money};
use crate::types::{Product, TaxRate};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A priced line in the cart.
///
/// Name and price are copied from the product when the line is created so
/// the quote reads the same as the bill it turns into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// Stock when the line was priced.
    pub available: i64,
}

impl CartItem {
    /// Creates a cart line from a product in the cart currency.
    pub fn from_product(product: &Product, quantity: i64, currency: Currency) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price(currency),
            quantity,
            available: product.stock,
        }
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// A cart priced in one currency.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding same product increases quantity)
/// - Quantity is 1..=999 and never above the product's stock
/// - At most 100 distinct items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub currency: Currency,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new(currency: Currency) -> Self {
        Cart {
            currency,
            items: Vec::new(),
        }
    }

    /// Adds a product or increases its quantity if already present.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }

        let existing = self
            .items
            .iter()
            .position(|i| i.product_id == product.id);

        let new_qty = match existing {
            Some(idx) => self.items[idx].quantity + quantity,
            None => quantity,
        };

        if new_qty > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: new_qty,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if !product.can_sell(new_qty) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: new_qty,
            });
        }

        match existing {
            Some(idx) => self.items[idx].quantity = new_qty,
            None => {
                if self.items.len() >= MAX_CART_ITEMS {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_ITEMS,
                    });
                }
                self.items
                    .push(CartItem::from_product(product, quantity, self.currency));
            }
        }

        Ok(())
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Totals with tax at `rate` on the subtotal.
    pub fn totals(&self, rate: TaxRate) -> CartTotals {
        let subtotal = self.subtotal();
        let tax = subtotal.calculate_tax(rate);
        CartTotals {
            currency: self.currency,
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    /// Converts the cart into bill lines, snapshotting name and price.
    pub fn into_line_drafts(self) -> Vec<LineDraft> {
        self.items
            .into_iter()
            .map(|i| LineDraft {
                product_id: Some(i.product_id),
                product_name: i.name,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect()
    }
}

/// Cart totals summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub currency: Currency,
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use chrono::Utc;

    fn test_product(id: &str, price_inr_minor: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            description: String::new(),
            category: Category::Earrings,
            price_inr_minor,
            price_bhd_minor: price_inr_minor / 220,
            gross_weight_mg: None,
            net_weight_mg: None,
            stock,
            images: vec![],
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_add_item() {
        let mut cart = Cart::new(Currency::Inr);
        let product = test_product("1", 99_900, 10);

        cart.add_item(&product, 2).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal().minor_units(), 199_800);
    }

    #[test]
    fn test_cart_add_same_product_increases_quantity() {
        let mut cart = Cart::new(Currency::Inr);
        let product = test_product("1", 99_900, 10);

        cart.add_item(&product, 2).unwrap();
        cart.add_item(&product, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_cart_uses_currency_price() {
        let mut cart = Cart::new(Currency::Bhd);
        let product = test_product("1", 220_000, 10);

        cart.add_item(&product, 1).unwrap();

        assert_eq!(cart.items[0].unit_price.minor_units(), 1_000);
    }

    #[test]
    fn test_merged_quantity_checked_against_stock() {
        let mut cart = Cart::new(Currency::Inr);
        let product = test_product("1", 1_000, 4);

        cart.add_item(&product, 3).unwrap();
        let err = cart.add_item(&product, 2).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 4,
                requested: 5,
                ..
            }
        ));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_inactive_product_is_not_found() {
        let mut cart = Cart::new(Currency::Inr);
        let mut product = test_product("1", 1_000, 4);
        product.is_active = false;

        assert!(matches!(
            cart.add_item(&product, 1),
            Err(CoreError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new(Currency::Inr);
        let product = test_product("1", 1_000, 5_000);

        assert!(matches!(cart.add_item(&product, 0), Err(CoreError::Validation(_))));
        cart.add_item(&product, 999).unwrap();
        assert!(matches!(
            cart.add_item(&product, 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_line_cap() {
        let mut cart = Cart::new(Currency::Inr);
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&test_product(&i.to_string(), 100, 1), 1).unwrap();
        }
        assert!(matches!(
            cart.add_item(&test_product("extra", 100, 1), 1),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_cart_totals() {
        let mut cart = Cart::new(Currency::Inr);
        cart.add_item(&test_product("1", 100_000, 5), 2).unwrap();

        let totals = cart.totals(TaxRate::from_bps(300));

        assert_eq!(totals.subtotal.minor_units(), 200_000);
        assert_eq!(totals.tax.minor_units(), 6_000);
        assert_eq!(totals.total.minor_units(), 206_000);
    }

    #[test]
    fn test_into_line_drafts_snapshots() {
        let mut cart = Cart::new(Currency::Inr);
        cart.add_item(&test_product("1", 100_000, 5), 2).unwrap();

        let drafts = cart.into_line_drafts();

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].product_id.as_deref(), Some("1"));
        assert_eq!(drafts[0].product_name, "Product 1");
        assert_eq!(drafts[0].unit_price.minor_units(), 100_000);
    }
}

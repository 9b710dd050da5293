//! # Bill Repository
//!
//! Database operations for bills, bill items and the bill number sequence.
//!
//! ## Bill Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create(new_bill, day, now)                           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── 1. bill_sequences upsert ... RETURNING last_value                │
//! │   │        (first statement: takes the write lock, so two              │
//! │   │         transactions can never read the same value)                │
//! │   ├── 2. INSERT bills            (bill_number UNIQUE as backstop)      │
//! │   ├── 3. INSERT bill_items       (one per line, ordered by position)   │
//! │   └── 4. UPDATE products stock   (catalog lines only, never below 0)   │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure rolls everything back, including the sequence bump.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bills are immutable: there is no update or delete.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::like_pattern;
use crate::error::{DbError, DbResult};
use jewel_core::billing::{BillNumber, BillTotals, PricedLine};
use jewel_core::{Bill, BillItem, BillKind, Currency, PaymentMethod};

const BILL_COLUMNS: &str = "id, bill_number, kind, customer_name, customer_email, customer_phone, \
     customer_address, currency, subtotal_minor, making_charges_minor, tax_minor, \
     discount_minor, total_minor, paid_minor, payment_method, payment_reference, created_at";

const ITEM_COLUMNS: &str =
    "id, bill_id, product_id, product_name, quantity, unit_price_minor, line_total_minor";

// =============================================================================
// Inputs
// =============================================================================

/// Everything needed to write a bill; totals are already computed.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub kind: BillKind,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub currency: Currency,
    pub lines: Vec<PricedLine>,
    pub totals: BillTotals,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
}

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange { start, end }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Numbers and stores a bill in one transaction.
    ///
    /// ## Arguments
    /// * `new_bill` - customer, lines and totals
    /// * `day` - store calendar day the number is issued under
    /// * `now` - creation timestamp
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - a catalog line's product is missing or inactive
    /// * `Err(DbError::InsufficientStock)` - a catalog line exceeds stock
    pub async fn create(
        &self,
        new_bill: NewBill,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> DbResult<Bill> {
        let prefix = new_bill.kind.prefix();
        let mut tx = self.pool.begin().await?;

        // 1. Sequence
        let index: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bill_sequences (prefix, day, last_value)
            VALUES (?1, ?2, 1)
            ON CONFLICT (prefix, day) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(prefix)
        .bind(BillNumber::day_key(day))
        .fetch_one(&mut *tx)
        .await?;

        let index = u32::try_from(index)
            .map_err(|_| DbError::Internal(format!("bill sequence out of range: {}", index)))?;
        let bill_number = BillNumber::new(prefix, day, index).to_string();
        let bill_id = Uuid::new_v4().to_string();

        debug!(id = %bill_id, bill_number = %bill_number, "Creating bill");

        // 2. Bill
        let totals = new_bill.totals;
        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, kind,
                customer_name, customer_email, customer_phone, customer_address,
                currency, subtotal_minor, making_charges_minor, tax_minor,
                discount_minor, total_minor, paid_minor,
                payment_method, payment_reference, created_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17
            )
            "#,
        )
        .bind(&bill_id)
        .bind(&bill_number)
        .bind(new_bill.kind)
        .bind(&new_bill.customer_name)
        .bind(&new_bill.customer_email)
        .bind(&new_bill.customer_phone)
        .bind(&new_bill.customer_address)
        .bind(new_bill.currency)
        .bind(totals.subtotal.minor_units())
        .bind(totals.making_charges.minor_units())
        .bind(totals.tax.minor_units())
        .bind(totals.discount.minor_units())
        .bind(totals.total.minor_units())
        .bind(totals.paid_amount.minor_units())
        .bind(new_bill.payment_method)
        .bind(&new_bill.payment_reference)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field == "bill_number" => {
                DbError::duplicate(field, &bill_number)
            }
            DbError::UniqueViolation { field, .. } if field == "payment_reference" => {
                DbError::duplicate(field, new_bill.payment_reference.clone().unwrap_or_default())
            }
            other => other,
        })?;

        // 3. Items, 4. Stock
        let mut items = Vec::with_capacity(new_bill.lines.len());
        for (position, line) in new_bill.lines.iter().enumerate() {
            if let Some(product_id) = &line.product_id {
                decrement_stock(&mut tx, product_id, line.quantity, now).await?;
            }

            let item = BillItem {
                id: Uuid::new_v4().to_string(),
                bill_id: bill_id.clone(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_minor: line.unit_price.minor_units(),
                line_total_minor: line.line_total.minor_units(),
            };

            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, position, product_id, product_name,
                    quantity, unit_price_minor, line_total_minor
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.bill_id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price_minor)
            .bind(item.line_total_minor)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            id = %bill_id,
            bill_number = %bill_number,
            kind = ?new_bill.kind,
            items = items.len(),
            total = totals.total.minor_units(),
            "Bill created"
        );

        Ok(Bill {
            id: bill_id,
            bill_number,
            kind: new_bill.kind,
            customer_name: new_bill.customer_name,
            customer_email: new_bill.customer_email,
            customer_phone: new_bill.customer_phone,
            customer_address: new_bill.customer_address,
            currency: new_bill.currency,
            subtotal_minor: totals.subtotal.minor_units(),
            making_charges_minor: totals.making_charges.minor_units(),
            tax_minor: totals.tax.minor_units(),
            discount_minor: totals.discount.minor_units(),
            total_minor: totals.total.minor_units(),
            paid_minor: totals.paid_amount.minor_units(),
            payment_method: new_bill.payment_method,
            payment_reference: new_bill.payment_reference,
            created_at: now,
            items,
        })
    }

    /// Gets a bill with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let sql = format!("SELECT {} FROM bills WHERE id = ?1", BILL_COLUMNS);

        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match bill {
            Some(mut bill) => {
                bill.items = self.get_items(&bill.id).await?;
                Ok(Some(bill))
            }
            None => Ok(None),
        }
    }

    /// Gets a bill by its exact number (`PJ/20240315-007`).
    pub async fn get_by_number(&self, bill_number: &str) -> DbResult<Option<Bill>> {
        let sql = format!("SELECT {} FROM bills WHERE bill_number = ?1", BILL_COLUMNS);

        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(bill_number)
            .fetch_optional(&self.pool)
            .await?;

        match bill {
            Some(mut bill) => {
                bill.items = self.get_items(&bill.id).await?;
                Ok(Some(bill))
            }
            None => Ok(None),
        }
    }

    /// Gets the items of one bill in entry order.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let sql = format!(
            "SELECT {} FROM bill_items WHERE bill_id = ?1 ORDER BY position",
            ITEM_COLUMNS
        );

        let items = sqlx::query_as::<_, BillItem>(&sql)
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// All bills, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Bill>> {
        let sql = format!(
            "SELECT {} FROM bills ORDER BY created_at DESC, bill_number DESC",
            BILL_COLUMNS
        );

        let bills = sqlx::query_as::<_, Bill>(&sql)
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(bills).await
    }

    /// Bills whose number, customer name or email contains `term`
    /// (case-insensitive), newest first.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Bill>> {
        debug!(term = %term, "Searching bills");

        let sql = format!(
            r#"
            SELECT {} FROM bills
            WHERE bill_number LIKE ?1 ESCAPE '\'
               OR customer_name LIKE ?1 ESCAPE '\'
               OR customer_email LIKE ?1 ESCAPE '\'
            ORDER BY created_at DESC, bill_number DESC
            "#,
            BILL_COLUMNS
        );

        let bills = sqlx::query_as::<_, Bill>(&sql)
            .bind(like_pattern(term))
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(bills).await
    }

    /// Bills created inside `range`, newest first.
    pub async fn list_between(&self, range: DateRange) -> DbResult<Vec<Bill>> {
        debug!(start = %range.start, end = %range.end, "Listing bills by date");

        let sql = format!(
            r#"
            SELECT {} FROM bills
            WHERE julianday(created_at) >= julianday(?1)
              AND julianday(created_at) < julianday(?2)
            ORDER BY created_at DESC, bill_number DESC
            "#,
            BILL_COLUMNS
        );

        let bills = sqlx::query_as::<_, Bill>(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(bills).await
    }

    /// Number of bills issued under `prefix` on `day`.
    #[cfg(test)]
    pub async fn count_for_day(&self, prefix: &str, day: NaiveDate) -> DbResult<i64> {
        let last: Option<i64> = sqlx::query_scalar(
            "SELECT last_value FROM bill_sequences WHERE prefix = ?1 AND day = ?2",
        )
        .bind(prefix)
        .bind(BillNumber::day_key(day))
        .fetch_optional(&self.pool)
        .await?;

        Ok(last.unwrap_or(0))
    }

    /// Loads items for many bills with one query.
    async fn attach_items(&self, mut bills: Vec<Bill>) -> DbResult<Vec<Bill>> {
        if bills.is_empty() {
            return Ok(bills);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM bill_items WHERE bill_id IN (",
            ITEM_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for bill in &bills {
            separated.push_bind(bill.id.clone());
        }
        separated.push_unseparated(") ORDER BY bill_id, position");

        let items: Vec<BillItem> = builder
            .build_query_as::<BillItem>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_bill: HashMap<String, Vec<BillItem>> = HashMap::new();
        for item in items {
            by_bill.entry(item.bill_id.clone()).or_default().push(item);
        }

        for bill in &mut bills {
            bill.items = by_bill.remove(&bill.id).unwrap_or_default();
        }

        Ok(bills)
    }
}

/// Takes `quantity` units out of stock, failing instead of going negative.
async fn decrement_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND is_active = 1 AND stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let row: Option<(String, i64, bool)> =
        sqlx::query_as("SELECT name, stock, is_active FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;

    match row {
        Some((name, available, true)) => {
            warn!(product_id = %product_id, available, requested = quantity, "Insufficient stock");
            Err(DbError::InsufficientStock {
                product: name,
                available,
                requested: quantity,
            })
        }
        _ => Err(DbError::not_found("Product", product_id)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Listing active products, optionally by category
//! - CRUD with soft delete
//!
//! ## Visibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  is_active = 1  → listed, fetchable, sellable, editable                │
//! │  is_active = 0  → hidden everywhere; old bill items still reference it │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use jewel_core::{Category, Product};

const PRODUCT_COLUMNS: &str = "id, name, description, category, price_inr_minor, price_bhd_minor, \
     gross_weight_mg, net_weight_mg, stock, images, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products, newest first.
    ///
    /// ## Arguments
    /// * `category` - restrict to one category, or `None` for all
    pub async fn list_active(&self, category: Option<Category>) -> DbResult<Vec<Product>> {
        debug!(category = ?category, "Listing products");

        let products = match category {
            Some(category) => {
                let sql = format!(
                    "SELECT {} FROM products WHERE is_active = 1 AND category = ?1 \
                     ORDER BY created_at DESC",
                    PRODUCT_COLUMNS
                );
                sqlx::query_as::<_, Product>(&sql)
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM products WHERE is_active = 1 ORDER BY created_at DESC",
                    PRODUCT_COLUMNS
                );
                sqlx::query_as::<_, Product>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by ID regardless of its active flag.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets an active product by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found and active
    /// * `Ok(None)` - Missing or soft-deleted
    pub async fn get_active(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND is_active = 1",
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id should be generated beforehand)
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, category,
                price_inr_minor, price_bhd_minor,
                gross_weight_mg, net_weight_mg, stock, images,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category)
        .bind(product.price_inr_minor)
        .bind(product.price_bhd_minor)
        .bind(product.gross_weight_mg)
        .bind(product.net_weight_mg)
        .bind(product.stock)
        .bind(Json(&product.images))
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates an active product and returns the stored row.
    ///
    /// ## Arguments
    /// * `product` - catalog fields to store; its `stock` is ignored
    /// * `stock` - new stock level, or `None` to keep the stored one
    ///
    /// Bills decrement stock in their own transaction, so a caller holding
    /// an older read must pass `None` unless the stock was edited.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist or was deleted
    pub async fn update(&self, product: &Product, stock: Option<i64>) -> DbResult<Product> {
        debug!(id = %product.id, ?stock, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                category = ?4,
                price_inr_minor = ?5,
                price_bhd_minor = ?6,
                gross_weight_mg = ?7,
                net_weight_mg = ?8,
                stock = COALESCE(?9, stock),
                images = ?10,
                updated_at = ?11
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category)
        .bind(product.price_inr_minor)
        .bind(product.price_bhd_minor)
        .bind(product.gross_weight_mg)
        .bind(product.net_weight_mg)
        .bind(stock)
        .bind(Json(&product.images))
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        self.get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// Bill items keep a foreign key to the product they were sold from.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

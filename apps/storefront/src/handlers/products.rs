//! Catalog handlers.
//!
//! Reads are public; writes need an admin token and take
//! `multipart/form-data` so images can ride along with the fields.
//!
//! ## Form Fields
//! | Field         | Create   | Update   | Format                      |
//! |---------------|----------|----------|-----------------------------|
//! | `name`        | required | optional | 1..=200 chars               |
//! | `description` | optional | optional | ≤ 5000 chars                |
//! | `category`    | required | optional | e.g. `RINGS`                |
//! | `priceInr`    | required | optional | decimal, ≤ 2 places         |
//! | `priceBhd`    | required | optional | decimal, ≤ 3 places         |
//! | `grossWeight` | optional | optional | grams, ≤ 3 places           |
//! | `netWeight`   | optional | optional | grams, ≤ gross              |
//! | `stock`       | optional | optional | integer ≥ 0 (default 0)     |
//! | `images`      | files    | files    | jpeg/jpg/png/webp, ≤ 5      |

use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{info, warn};

use jewel_core::types::parse_weight_mg;
use jewel_core::validation::{
    validate_description, validate_non_negative, validate_product_name, validate_stock,
    validate_weights,
};
use jewel_core::{Category, Currency, Money, Product, ValidationError};
use jewel_db::repository::product::generate_product_id;

use crate::auth::AdminUser;
use crate::dto::{MessageResponse, ProductDto, ProductListQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::uploads::{discard_images, read_form, save_images, MultipartForm, UploadLimits};

/// `GET /api/products?category=RINGS`
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ProductDto>>> {
    let Query(query) = query?;

    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Category>()?),
    };

    let products = state.db.products().list_active(category).await?;
    Ok(Json(products.iter().map(ProductDto::from).collect()))
}

/// `GET /api/products/{id}` - 404 for unknown and deleted products.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductDto>> {
    let product = state
        .db
        .products()
        .get_active(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(ProductDto::from(&product)))
}

/// `POST /api/products` (admin, multipart) - `201 Created`.
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ProductDto>)> {
    let form = read_form(multipart, upload_limits(&state)).await?;

    let now = Utc::now();
    let mut product = Product {
        id: generate_product_id(),
        name: String::new(),
        description: String::new(),
        category: Category::Rings,
        price_inr_minor: 0,
        price_bhd_minor: 0,
        gross_weight_mg: None,
        net_weight_mg: None,
        stock: 0,
        images: Vec::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    apply_form(&form, &mut product, FormMode::Create)?;

    let uploads_dir = &state.config.uploads_dir;
    product.images = save_images(uploads_dir, form.images).await?;

    let saved = match state.db.products().insert(&product).await {
        Ok(saved) => saved,
        Err(e) => {
            discard_images(uploads_dir, &product.images).await;
            return Err(e.into());
        }
    };

    info!(
        product_id = %saved.id,
        name = %saved.name,
        images = saved.images.len(),
        by = %admin.email,
        "Product created"
    );
    Ok((StatusCode::CREATED, Json(ProductDto::from(&saved))))
}

/// `PUT /api/products/{id}` (admin, multipart).
///
/// Only the fields present change. Images are replaced when the request
/// uploads new ones and kept otherwise; replaced files are deleted once
/// the update is stored.
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<ProductDto>> {
    let form = read_form(multipart, upload_limits(&state)).await?;

    let products = state.db.products();
    let mut product = products
        .get_active(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    apply_form(&form, &mut product, FormMode::Update)?;
    // Written only when edited; sales may have moved it since the read
    let stock = form.text("stock").is_some().then_some(product.stock);

    let uploads_dir = &state.config.uploads_dir;
    let new_images = save_images(uploads_dir, form.images).await?;
    let replaced = if new_images.is_empty() {
        Vec::new()
    } else {
        std::mem::replace(&mut product.images, new_images.clone())
    };

    let saved = match products.update(&product, stock).await {
        Ok(saved) => saved,
        Err(e) => {
            discard_images(uploads_dir, &new_images).await;
            return Err(e.into());
        }
    };
    discard_images(uploads_dir, &replaced).await;

    info!(
        product_id = %saved.id,
        replaced_images = replaced.len(),
        by = %admin.email,
        "Product updated"
    );
    Ok(Json(ProductDto::from(&saved)))
}

/// `DELETE /api/products/{id}` (admin) - soft delete.
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.products().soft_delete(&id).await?;

    warn!(product_id = %id, by = %admin.email, "Product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

// =============================================================================
// Form Mapping
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormMode {
    Create,
    Update,
}

fn upload_limits(state: &AppState) -> UploadLimits {
    UploadLimits {
        max_file_bytes: state.config.max_upload_bytes,
        max_files: state.config.max_upload_files,
    }
}

/// Copies form fields onto `product`, validating each.
fn apply_form(form: &MultipartForm, product: &mut Product, mode: FormMode) -> Result<(), ValidationError> {
    let field = |name: &'static str| form_field(form, mode, name);

    if let Some(name) = field("name")? {
        validate_product_name(name)?;
        product.name = name.to_string();
    }

    if let Some(description) = form.fields.get("description") {
        let description = description.trim();
        validate_description(description)?;
        product.description = description.to_string();
    }

    if let Some(category) = field("category")? {
        product.category = category.parse()?;
    }

    if let Some(price) = field("priceInr")? {
        product.price_inr_minor = price_field("priceInr", price, Currency::Inr)?.minor_units();
    }

    if let Some(price) = field("priceBhd")? {
        product.price_bhd_minor = price_field("priceBhd", price, Currency::Bhd)?.minor_units();
    }

    if form.fields.contains_key("grossWeight") {
        product.gross_weight_mg = form
            .text("grossWeight")
            .map(|w| parse_weight_mg("grossWeight", w))
            .transpose()?;
    }

    if form.fields.contains_key("netWeight") {
        product.net_weight_mg = form
            .text("netWeight")
            .map(|w| parse_weight_mg("netWeight", w))
            .transpose()?;
    }

    validate_weights(product.gross_weight_mg, product.net_weight_mg)?;

    if let Some(stock) = form.text("stock") {
        let stock: i64 = stock.parse().map_err(|_| ValidationError::InvalidFormat {
            field: "stock".to_string(),
            reason: "must be a whole number".to_string(),
        })?;
        validate_stock(stock)?;
        product.stock = stock;
    }

    Ok(())
}

/// A text field; absent fields are an error only when creating.
fn form_field<'a>(
    form: &'a MultipartForm,
    mode: FormMode,
    name: &str,
) -> Result<Option<&'a str>, ValidationError> {
    match (mode, form.text(name)) {
        (FormMode::Create, None) => form.required(name).map(Some),
        (_, value) => Ok(value),
    }
}

fn price_field(field: &str, raw: &str, currency: Currency) -> Result<Money, ValidationError> {
    let price = Money::parse(raw, currency).map_err(|e| e.with_field(field))?;
    validate_non_negative(field, price)?;
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (k, v) in pairs {
            form.fields.insert(k.to_string(), v.to_string());
        }
        form
    }

    fn blank() -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            name: "Old".to_string(),
            description: "kept".to_string(),
            category: Category::Rings,
            price_inr_minor: 100,
            price_bhd_minor: 5,
            gross_weight_mg: Some(5_000),
            net_weight_mg: Some(4_000),
            stock: 2,
            images: vec![],
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_requires_core_fields() {
        let mut p = blank();
        let err = apply_form(&form(&[("name", "Jhumka")]), &mut p, FormMode::Create).unwrap_err();
        assert_eq!(err.field(), "category");
    }

    #[test]
    fn test_create_parses_prices_and_weights() {
        let mut p = blank();
        apply_form(
            &form(&[
                ("name", "Temple Jhumka"),
                ("category", "EARRINGS"),
                ("priceInr", "45999.5"),
                ("priceBhd", "210.125"),
                ("grossWeight", "12.345"),
                ("netWeight", "11"),
                ("stock", "4"),
            ]),
            &mut p,
            FormMode::Create,
        )
        .unwrap();

        assert_eq!(p.category, Category::Earrings);
        assert_eq!(p.price_inr_minor, 4_599_950);
        assert_eq!(p.price_bhd_minor, 210_125);
        assert_eq!(p.gross_weight_mg, Some(12_345));
        assert_eq!(p.net_weight_mg, Some(11_000));
        assert_eq!(p.stock, 4);
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let mut p = blank();
        apply_form(&form(&[("priceInr", "250")]), &mut p, FormMode::Update).unwrap();

        assert_eq!(p.name, "Old");
        assert_eq!(p.description, "kept");
        assert_eq!(p.price_inr_minor, 25_000);
        assert_eq!(p.stock, 2);
    }

    #[test]
    fn test_invalid_values_name_their_field() {
        let cases = [
            (("priceInr", "12.345"), "priceInr"),
            (("priceBhd", "-1"), "priceBhd"),
            (("netWeight", "6"), "netWeight"),
            (("stock", "many"), "stock"),
            (("category", "WATCHES"), "category"),
        ];
        for ((key, value), field) in cases {
            let mut p = blank();
            let err = apply_form(&form(&[(key, value)]), &mut p, FormMode::Update).unwrap_err();
            assert_eq!(err.field(), field, "{}={}", key, value);
        }
    }
}

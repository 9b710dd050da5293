//! # Validation Module
//!
//! Input validation utilities for the storefront.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser client                                               │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (serde deserialization)                           │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (email, bill_number)                           │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Image extensions accepted for product uploads.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "webp"];

/// MIME types accepted for product uploads.
pub const ALLOWED_IMAGE_MIME_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "image/webp"];

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use jewel_core::validation::validate_product_name;
///
/// assert!(validate_product_name("22K Temple Necklace").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required("name", name)?;
    max_len("name", name, 200)
}

/// Product description: optional, at most 5000 characters.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    max_len("description", description, 5000)
}

/// Validates a person's name (account holder or bill customer).
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    required(field, name)?;
    max_len(field, name, 100)
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@`
/// - Non-empty local part, domain containing a dot
/// - No whitespace, at most 254 characters
///
/// ## Example
/// ```rust
/// use jewel_core::validation::validate_email;
///
/// assert!(validate_email("asha@example.in").is_ok());
/// assert!(validate_email("asha@localhost").is_err());
/// assert!(validate_email("not an email").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    required("email", email)?;
    max_len("email", email, 254)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let dot = domain.rfind('.').ok_or_else(invalid)?;
    if dot == 0 || dot == domain.len() - 1 {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a new password: 6 to 128 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();
    if len < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }
    if len > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

/// Validates a phone number.
///
/// Digits plus `+`, `-`, spaces and parentheses; 7 to 20 characters.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    required("customerPhone", phone)?;

    let len = phone.chars().count();
    if !(7..=20).contains(&len) {
        return Err(ValidationError::OutOfRange {
            field: "customerPhone".to_string(),
            min: 7,
            max: 20,
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "customerPhone".to_string(),
            reason: "must contain only digits, spaces, +, -, ( and )".to_string(),
        });
    }

    Ok(())
}

/// Postal address: required, at most 500 characters.
pub fn validate_address(address: &str) -> ValidationResult<()> {
    required("customerAddress", address)?;
    max_len("customerAddress", address, 500)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    max_len("search", query, 100)?;
    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Stock count must not be negative.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Prices, charges and discounts must not be negative.
///
/// ## Example
/// ```rust
/// use jewel_core::money::Money;
/// use jewel_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("priceInr", Money::from_minor(0)).is_ok());
/// assert!(validate_non_negative("priceInr", Money::from_minor(-1)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Net weight may not exceed gross weight when both are given.
pub fn validate_weights(gross_mg: Option<i64>, net_mg: Option<i64>) -> ValidationResult<()> {
    if let (Some(gross), Some(net)) = (gross_mg, net_mg) {
        if net > gross {
            return Err(ValidationError::OutOfRange {
                field: "netWeight".to_string(),
                min: 0,
                max: gross,
            });
        }
    }
    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a cart or bill.
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_lines(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Upload Validators
// =============================================================================

/// Checks an uploaded image against the allow-list.
///
/// Both the file extension and the declared MIME type must be allowed.
///
/// ## Example
/// ```rust
/// use jewel_core::validation::validate_image_upload;
///
/// assert!(validate_image_upload("ring.JPG", Some("image/jpeg")).is_ok());
/// assert!(validate_image_upload("ring.gif", Some("image/gif")).is_err());
/// assert!(validate_image_upload("ring.png", Some("text/html")).is_err());
/// ```
pub fn validate_image_upload(file_name: &str, content_type: Option<&str>) -> ValidationResult<()> {
    let not_allowed = || ValidationError::NotAllowed {
        field: "images".to_string(),
        allowed: ALLOWED_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
    };

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(not_allowed)?;
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(not_allowed());
    }

    let mime = content_type.map(str::to_ascii_lowercase).ok_or_else(not_allowed)?;
    if !ALLOWED_IMAGE_MIME_TYPES.contains(&mime.as_str()) {
        return Err(not_allowed());
    }

    Ok(())
}

/// Reduces an uploaded file name to `[A-Za-z0-9._-]`.
///
/// Path components are dropped so the result can never escape the uploads
/// directory.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(original);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use jewel_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Kundan Choker Set").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[rstest]
    #[case("asha@example.in", true)]
    #[case("ASHA.K@Mail.Example.com", true)]
    #[case("", false)]
    #[case("asha", false)]
    #[case("@example.com", false)]
    #[case("asha@example", false)]
    #[case("asha@.com", false)]
    #[case("asha@example.", false)]
    #[case("as ha@example.com", false)]
    #[case("a@b@example.com", false)]
    fn test_validate_email(#[case] email: &str, #[case] ok: bool) {
        assert_eq!(validate_email(email).is_ok(), ok, "{}", email);
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(matches!(
            validate_password("12345"),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[rstest]
    #[case("+91 98765 43210", true)]
    #[case("(022) 2345-6789", true)]
    #[case("12345", false)]
    #[case("98765abc43", false)]
    fn test_validate_phone(#[case] phone: &str, #[case] ok: bool) {
        assert_eq!(validate_phone(phone).is_ok(), ok, "{}", phone);
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_stock_and_money() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
        assert!(validate_non_negative("discount", Money::from_minor(-5)).is_err());
    }

    #[test]
    fn test_validate_weights() {
        assert!(validate_weights(Some(5_000), Some(4_800)).is_ok());
        assert!(validate_weights(Some(5_000), Some(5_000)).is_ok());
        assert!(validate_weights(None, Some(4_800)).is_ok());
        assert!(validate_weights(Some(4_800), Some(5_000)).is_err());
    }

    #[test]
    fn test_validate_cart_lines() {
        assert!(validate_cart_lines(1).is_ok());
        assert!(validate_cart_lines(MAX_CART_ITEMS).is_ok());
        assert!(validate_cart_lines(MAX_CART_ITEMS + 1).is_err());
    }

    #[rstest]
    #[case("ring.jpg", Some("image/jpeg"), true)]
    #[case("ring.jpeg", Some("image/jpeg"), true)]
    #[case("ring.PNG", Some("image/png"), true)]
    #[case("ring.webp", Some("image/webp"), true)]
    #[case("ring.gif", Some("image/gif"), false)]
    #[case("ring.png", Some("application/pdf"), false)]
    #[case("ring.png", None, false)]
    #[case("ring", Some("image/png"), false)]
    #[case("shell.php.png", Some("image/png"), true)]
    fn test_validate_image_upload(
        #[case] name: &str,
        #[case] mime: Option<&str>,
        #[case] ok: bool,
    ) {
        assert_eq!(validate_image_upload(name, mime).is_ok(), ok, "{}", name);
    }

    #[rstest]
    #[case("Gold Ring (front).jpg", "Gold_Ring__front_.jpg")]
    #[case("../../etc/passwd.png", "passwd.png")]
    #[case("C:\\photos\\bangle.webp", "bangle.webp")]
    #[case(".hidden.png", "hidden.png")]
    #[case("", "upload")]
    fn test_sanitize_file_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(input), expected);
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(300).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }
}

//! # Error Types
//!
//! Domain-specific error types for jewel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  jewel-core errors (this file)                                         │
//! │  ├── CoreError        - Pricing and catalog rule failures              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  jewel-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP errors (apps/storefront)                                         │
//! │  └── ApiError         - What browser clients see (JSON body)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → HTTP status            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id is unknown or the product was soft-deleted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Trying to sell more than is on the shelf.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart quote (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Gold Ring", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// 409 Conflict
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Bill not found.
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// Cart or bill has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A client-supplied figure disagrees with the server computation.
    #[error("{field} does not match: expected {expected}, got {actual}")]
    TotalsMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Discount larger than the amount it is taken from.
    #[error("Discount {discount} exceeds bill amount {gross}")]
    DiscountExceedsTotal { discount: String, gross: String },

    /// Arithmetic left the i64 minor-unit range.
    #[error("Amount overflow while computing {0}")]
    AmountOverflow(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date, too many decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate email).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }

    /// Re-labels the error with the caller's field name.
    pub fn with_field(self, name: &str) -> Self {
        let field = name.to_string();
        match self {
            ValidationError::Required { .. } => ValidationError::Required { field },
            ValidationError::TooShort { min, .. } => ValidationError::TooShort { field, min },
            ValidationError::TooLong { max, .. } => ValidationError::TooLong { field, max },
            ValidationError::OutOfRange { min, max, .. } => {
                ValidationError::OutOfRange { field, min, max }
            }
            ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
            ValidationError::Negative { .. } => ValidationError::Negative { field },
            ValidationError::InvalidFormat { reason, .. } => {
                ValidationError::InvalidFormat { field, reason }
            }
            ValidationError::NotAllowed { allowed, .. } => {
                ValidationError::NotAllowed { field, allowed }
            }
            ValidationError::Duplicate { value, .. } => ValidationError::Duplicate { field, value },
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # Money Module
//!
//! Provides the `Money` and `Currency` types for handling monetary values
//! safely in the two currencies the store trades in.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A 3-decimal currency makes it worse:                                   │
//! │    BD 12.345 × 3 = 37.034999999...  → invoice off by one fils           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    INR: paise (exponent 2)   "1234.50" → 123450                         │
//! │    BHD: fils  (exponent 3)   "12.345"  → 12345                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use jewel_core::money::{Currency, Money};
//!
//! let price = Money::parse("12.345", Currency::Bhd).unwrap();
//! assert_eq!(price.minor_units(), 12345);
//!
//! let line = price * 3;
//! assert_eq!(line.format(Currency::Bhd), "37.035");
//! assert_eq!(line.display(Currency::Bhd), "BD 37.035");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Currency
// =============================================================================

/// The closed set of currencies the store prices in.
///
/// | Currency | Exponent | Minor unit | Symbol | Tax |
/// |----------|----------|------------|--------|-----|
/// | INR      | 2        | paisa      | Rs.    | GST |
/// | BHD      | 3        | fils       | BD     | VAT |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Currency {
    #[serde(alias = "inr")]
    Inr,
    #[serde(alias = "bhd")]
    Bhd,
}

impl Currency {
    /// Every supported currency.
    pub const ALL: [Currency; 2] = [Currency::Inr, Currency::Bhd];

    /// Number of fractional digits in the major unit.
    #[inline]
    pub const fn exponent(&self) -> u32 {
        match self {
            Currency::Inr => 2,
            Currency::Bhd => 3,
        }
    }

    /// Minor units per major unit (100 for INR, 1000 for BHD).
    #[inline]
    pub const fn minor_per_major(&self) -> i64 {
        10_i64.pow(self.exponent())
    }

    /// ISO 4217 code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Bhd => "BHD",
        }
    }

    /// Symbol printed on invoices.
    ///
    /// The builtin PDF fonts have no glyph for the rupee sign, so INR prints
    /// as `Rs.`.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Currency::Inr => "Rs.",
            Currency::Bhd => "BD",
        }
    }

    /// Name of the sales tax charged in this currency's market.
    pub const fn tax_label(&self) -> &'static str {
        match self {
            Currency::Inr => "GST",
            Currency::Bhd => "VAT",
        }
    }

    /// Lowercase code expected by the payment gateway.
    pub const fn gateway_code(&self) -> &'static str {
        match self {
            Currency::Inr => "inr",
            Currency::Bhd => "bhd",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::Inr),
            "BHD" => Ok(Currency::Bhd),
            _ => Err(ValidationError::NotAllowed {
                field: "currency".to_string(),
                allowed: Currency::ALL.iter().map(|c| c.code().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of some currency.
///
/// `Money` does not carry its currency; the owning record (product price
/// column, bill) does. Parsing and formatting take the currency explicitly
/// so the exponent is always the right one.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_inr / price_bhd ──► BillItem.unit_price ──► line_total   │
/// │                                                                         │
/// │  Σ line_total ──► subtotal ──► + making + tax − discount ──► total      │
/// │                                                                         │
/// │  total ──► PaymentIntent.amount (minor units) ──► Stripe                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (paise, fils).
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses a decimal major-unit string exactly.
    ///
    /// Accepts `"1234"`, `"1234.5"`, `"0.05"`, `".5"` and a leading `-`.
    /// More fractional digits than the currency exponent is rejected rather
    /// than rounded.
    ///
    /// ## Example
    /// ```rust
    /// use jewel_core::money::{Currency, Money};
    ///
    /// assert_eq!(Money::parse("1234.5", Currency::Inr).unwrap().minor_units(), 123450);
    /// assert_eq!(Money::parse("12.345", Currency::Bhd).unwrap().minor_units(), 12345);
    /// assert!(Money::parse("12.345", Currency::Inr).is_err());
    /// ```
    pub fn parse(input: &str, currency: Currency) -> Result<Money, ValidationError> {
        parse_fixed(input, currency.exponent())
            .map(Money)
            .map_err(|reason| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason,
            })
    }

    /// Formats as a plain fixed-point string with exactly `exponent` digits.
    pub fn format(&self, currency: Currency) -> String {
        format_fixed(self.0, currency.exponent())
    }

    /// Formats with the currency symbol, as printed on invoices.
    pub fn display(&self, currency: Currency) -> String {
        format!("{} {}", currency.symbol(), self.format(currency))
    }

    /// Calculates tax on this amount, rounding half-up in minor units.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    /// The +5000 provides rounding (5000/10000 = 0.5)
    ///
    /// ## Example
    /// ```rust
    /// use jewel_core::money::Money;
    /// use jewel_core::types::TaxRate;
    ///
    /// let amount = Money::from_minor(10050); // Rs. 100.50
    /// let gst = amount.calculate_tax(TaxRate::from_bps(300));
    /// // 301.5 paise → 302
    /// assert_eq!(gst.minor_units(), 302);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps the intermediate product from overflowing
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(tax as i64)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    #[inline]
    pub fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds, returning `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtracts, returning `None` on overflow.
    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// `self - other`, floored at zero.
    #[inline]
    pub fn saturating_sub_floor_zero(&self, other: Money) -> Money {
        Money((self.0.saturating_sub(other.0)).max(0))
    }
}

// =============================================================================
// Fixed-point helpers
// =============================================================================
// Shared with weights (milligrams) in `types`.

pub(crate) fn parse_fixed(input: &str, scale: u32) -> Result<i64, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }

    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err("must contain digits".to_string());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err("must be a decimal number".to_string());
    }
    if frac_part.len() > scale as usize {
        return Err(format!("at most {} decimal places", scale));
    }

    let overflow = || "amount is too large".to_string();
    let multiplier = 10_i64.pow(scale);

    let major: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };

    let mut minor: i64 = 0;
    if !frac_part.is_empty() {
        minor = frac_part.parse().map_err(|_| overflow())?;
        minor *= 10_i64.pow(scale - frac_part.len() as u32);
    }

    let value = major
        .checked_mul(multiplier)
        .and_then(|v| v.checked_add(minor))
        .ok_or_else(overflow)?;

    Ok(if negative { -value } else { value })
}

pub(crate) fn format_fixed(value: i64, scale: u32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    if scale == 0 {
        return format!("{}{}", sign, abs);
    }
    let multiplier = 10_u64.pow(scale);
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / multiplier,
        abs % multiplier,
        width = scale as usize
    )
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-style display in raw minor units. Use [`Money::display`] for
/// anything a customer reads.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} minor", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1234.50", Currency::Inr, 123450)]
    #[case("1234.5", Currency::Inr, 123450)]
    #[case("1234", Currency::Inr, 123400)]
    #[case("0.05", Currency::Inr, 5)]
    #[case(".5", Currency::Inr, 50)]
    #[case("12.345", Currency::Bhd, 12345)]
    #[case("12.3", Currency::Bhd, 12300)]
    #[case(" 7 ", Currency::Bhd, 7000)]
    #[case("-5.50", Currency::Inr, -550)]
    fn test_parse_exact(#[case] input: &str, #[case] currency: Currency, #[case] minor: i64) {
        assert_eq!(Money::parse(input, currency).unwrap().minor_units(), minor);
    }

    #[rstest]
    #[case("", Currency::Inr)]
    #[case(".", Currency::Inr)]
    #[case("12.345", Currency::Inr)]
    #[case("1.2345", Currency::Bhd)]
    #[case("1,234.00", Currency::Inr)]
    #[case("1e3", Currency::Inr)]
    #[case("abc", Currency::Bhd)]
    #[case("99999999999999999999", Currency::Inr)]
    fn test_parse_rejects(#[case] input: &str, #[case] currency: Currency) {
        let err = Money::parse(input, currency).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_format_uses_currency_exponent() {
        assert_eq!(Money::from_minor(123450).format(Currency::Inr), "1234.50");
        assert_eq!(Money::from_minor(5).format(Currency::Inr), "0.05");
        assert_eq!(Money::from_minor(12345).format(Currency::Bhd), "12.345");
        assert_eq!(Money::from_minor(7).format(Currency::Bhd), "0.007");
        assert_eq!(Money::from_minor(-550).format(Currency::Inr), "-5.50");
        assert_eq!(Money::zero().format(Currency::Bhd), "0.000");
    }

    #[test]
    fn test_display_prefixes_symbol() {
        assert_eq!(Money::from_minor(150000).display(Currency::Inr), "Rs. 1500.00");
        assert_eq!(Money::from_minor(1500).display(Currency::Bhd), "BD 1.500");
    }

    #[test]
    fn test_currency_metadata() {
        assert_eq!(Currency::Inr.minor_per_major(), 100);
        assert_eq!(Currency::Bhd.minor_per_major(), 1000);
        assert_eq!(Currency::Inr.tax_label(), "GST");
        assert_eq!(Currency::Bhd.tax_label(), "VAT");
        assert_eq!("bhd".parse::<Currency>().unwrap(), Currency::Bhd);
        assert!("USD".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_serde_accepts_lowercase_alias() {
        let c: Currency = serde_json::from_str("\"inr\"").unwrap();
        assert_eq!(c, Currency::Inr);
        assert_eq!(serde_json::to_string(&Currency::Bhd).unwrap(), "\"BHD\"");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor_units(), 1500);
        assert_eq!((a - b).minor_units(), 500);
        assert_eq!((a * 3).minor_units(), 3000);
        assert_eq!(vec![a, b, b].into_iter().sum::<Money>().minor_units(), 2000);
        assert_eq!(b.saturating_sub_floor_zero(a), Money::zero());
        assert!(Money::from_minor(i64::MAX).checked_mul_quantity(2).is_none());
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 1000 paise at 3% = 30
        assert_eq!(Money::from_minor(1000).calculate_tax(TaxRate::from_bps(300)).minor_units(), 30);
        // 10050 at 3% = 301.5 → 302
        assert_eq!(Money::from_minor(10050).calculate_tax(TaxRate::from_bps(300)).minor_units(), 302);
        // 12345 fils at 10% = 1234.5 → 1235
        assert_eq!(Money::from_minor(12345).calculate_tax(TaxRate::from_bps(1000)).minor_units(), 1235);
    }
}

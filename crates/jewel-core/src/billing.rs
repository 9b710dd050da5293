//! # Billing Rules
//!
//! Bill numbering and totals computation. Both counter bills and
//! storefront orders go through here.
//!
//! ## Bill Number
//! ```text
//!   PJ/20240315-007
//!   ── ──────── ───
//!   │     │      └── index within (prefix, day), zero-padded to 3
//!   │     └───────── calendar day in the store's timezone
//!   └─────────────── PJ = counter bill, ORD = storefront order
//! ```
//!
//! The index itself comes from the persisted per-day sequence in jewel-db;
//! this module only formats and parses.
//!
//! ## Totals
//! ```text
//!   subtotal       = Σ unit_price × quantity
//!   tax            = given, or rate × (subtotal + making_charges)
//!   total          = subtotal + making_charges + tax − discount
//!   balance_due    = max(total − paid, 0)
//!   change_due     = max(paid − total, 0)
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Currency, Money};
use crate::types::TaxRate;
use crate::validation::{validate_cart_lines, validate_quantity};
use crate::{DEFAULT_GST_RATE_BPS, DEFAULT_VAT_RATE_BPS};

// =============================================================================
// Bill Number
// =============================================================================

/// A parsed bill number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillNumber {
    pub prefix: String,
    pub day: NaiveDate,
    pub index: u32,
}

impl BillNumber {
    pub fn new(prefix: impl Into<String>, day: NaiveDate, index: u32) -> Self {
        BillNumber {
            prefix: prefix.into(),
            day,
            index,
        }
    }

    /// Day component as stored in the sequence table (`YYYYMMDD`).
    pub fn day_key(day: NaiveDate) -> String {
        day.format("%Y%m%d").to_string()
    }

    /// Form safe for file names (`PJ_20240315-007`).
    pub fn file_safe(number: &str) -> String {
        number.replace('/', "_")
    }
}

impl fmt::Display for BillNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}-{:03}",
            self.prefix,
            Self::day_key(self.day),
            self.index
        )
    }
}

impl FromStr for BillNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "billNumber".to_string(),
            reason: "expected PREFIX/YYYYMMDD-NNN".to_string(),
        };

        let (prefix, rest) = s.split_once('/').ok_or_else(invalid)?;
        let (day, index) = rest.split_once('-').ok_or_else(invalid)?;

        if prefix.is_empty() || day.len() != 8 || index.len() < 3 {
            return Err(invalid());
        }

        let day = NaiveDate::parse_from_str(day, "%Y%m%d").map_err(|_| invalid())?;
        let index: u32 = index.parse().map_err(|_| invalid())?;
        if index == 0 {
            return Err(invalid());
        }

        Ok(BillNumber::new(prefix, day, index))
    }
}

/// Calendar day of `now` in the store's timezone.
///
/// An offset outside ±24h falls back to UTC; configuration rejects those
/// before they get here.
pub fn bill_day(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

// =============================================================================
// Tax Rates
// =============================================================================

/// Configured tax rates, one per currency market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRates {
    pub gst: TaxRate,
    pub vat: TaxRate,
}

impl TaxRates {
    pub fn for_currency(&self, currency: Currency) -> TaxRate {
        match currency {
            Currency::Inr => self.gst,
            Currency::Bhd => self.vat,
        }
    }
}

impl Default for TaxRates {
    fn default() -> Self {
        TaxRates {
            gst: TaxRate::from_bps(DEFAULT_GST_RATE_BPS),
            vat: TaxRate::from_bps(DEFAULT_VAT_RATE_BPS),
        }
    }
}

// =============================================================================
// Lines
// =============================================================================

/// A bill line before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDraft {
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// A line with its total computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Validates and prices every line of a bill.
///
/// Lines are kept as given; two lines for the same product may carry
/// different prices on a counter bill.
pub fn price_lines(drafts: Vec<LineDraft>) -> CoreResult<Vec<PricedLine>> {
    if drafts.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }
    validate_cart_lines(drafts.len())?;

    drafts
        .into_iter()
        .map(|draft| {
            validate_quantity(draft.quantity)?;
            if draft.product_name.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "productName".to_string(),
                }
                .into());
            }
            if draft.unit_price.is_negative() {
                return Err(ValidationError::Negative {
                    field: "unitPrice".to_string(),
                }
                .into());
            }

            let line_total = draft
                .unit_price
                .checked_mul_quantity(draft.quantity)
                .ok_or_else(|| CoreError::AmountOverflow("line total".to_string()))?;

            Ok(PricedLine {
                product_id: draft.product_id,
                product_name: draft.product_name.trim().to_string(),
                quantity: draft.quantity,
                unit_price: draft.unit_price,
                line_total,
            })
        })
        .collect()
}

// =============================================================================
// Totals
// =============================================================================

/// Client-supplied money fields of a bill request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalsInput {
    pub making_charges: Money,
    /// `None` computes tax from the configured rate.
    pub tax: Option<Money>,
    pub discount: Money,
    pub paid_amount: Money,
    /// Must match the computed subtotal when present.
    pub claimed_subtotal: Option<Money>,
    /// Must match the computed total when present.
    pub claimed_total: Option<Money>,
}

/// The money summary of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal: Money,
    pub making_charges: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub paid_amount: Money,
}

impl BillTotals {
    /// Amount still owed by the customer.
    pub fn balance_due(&self) -> Money {
        self.total.saturating_sub_floor_zero(self.paid_amount)
    }

    /// Amount handed back to the customer.
    pub fn change_due(&self) -> Money {
        self.paid_amount.saturating_sub_floor_zero(self.total)
    }
}

fn non_negative(field: &str, amount: Money) -> CoreResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Computes the totals of a bill from its priced lines.
///
/// ## Rules
/// - subtotal is always recomputed; a claimed subtotal must agree
/// - tax defaults to `rate × (subtotal + making_charges)`, half-up
/// - discount may not exceed `subtotal + making_charges + tax`
/// - a claimed total must agree with the result
///
/// ## Example
/// ```rust
/// use jewel_core::billing::{compute_totals, price_lines, LineDraft, TaxRates, TotalsInput};
/// use jewel_core::money::{Currency, Money};
///
/// let lines = price_lines(vec![LineDraft {
///     product_id: None,
///     product_name: "Gold Chain".to_string(),
///     quantity: 2,
///     unit_price: Money::parse("10000", Currency::Inr).unwrap(),
/// }])
/// .unwrap();
///
/// let input = TotalsInput {
///     making_charges: Money::parse("500", Currency::Inr).unwrap(),
///     ..Default::default()
/// };
/// let totals = compute_totals(&lines, Currency::Inr, &TaxRates::default(), &input).unwrap();
///
/// // 3% of 20500.00
/// assert_eq!(totals.tax.format(Currency::Inr), "615.00");
/// assert_eq!(totals.total.format(Currency::Inr), "21115.00");
/// ```
pub fn compute_totals(
    lines: &[PricedLine],
    currency: Currency,
    rates: &TaxRates,
    input: &TotalsInput,
) -> CoreResult<BillTotals> {
    non_negative("makingCharges", input.making_charges)?;
    non_negative("discount", input.discount)?;
    non_negative("paidAmount", input.paid_amount)?;
    if let Some(tax) = input.tax {
        non_negative("tax", tax)?;
    }

    let overflow = |what: &str| CoreError::AmountOverflow(what.to_string());

    let subtotal = lines.iter().try_fold(Money::zero(), |acc, line| {
        acc.checked_add(line.line_total)
            .ok_or_else(|| overflow("subtotal"))
    })?;

    if let Some(claimed) = input.claimed_subtotal {
        if claimed != subtotal {
            return Err(CoreError::TotalsMismatch {
                field: "subtotal".to_string(),
                expected: subtotal.format(currency),
                actual: claimed.format(currency),
            });
        }
    }

    let taxable = subtotal
        .checked_add(input.making_charges)
        .ok_or_else(|| overflow("taxable amount"))?;

    let tax = match input.tax {
        Some(tax) => tax,
        None => taxable.calculate_tax(rates.for_currency(currency)),
    };

    let gross = taxable
        .checked_add(tax)
        .ok_or_else(|| overflow("total"))?;

    if input.discount > gross {
        return Err(CoreError::DiscountExceedsTotal {
            discount: input.discount.format(currency),
            gross: gross.format(currency),
        });
    }

    let total = gross - input.discount;

    if let Some(claimed) = input.claimed_total {
        if claimed != total {
            return Err(CoreError::TotalsMismatch {
                field: "total".to_string(),
                expected: total.format(currency),
                actual: claimed.format(currency),
            });
        }
    }

    Ok(BillTotals {
        subtotal,
        making_charges: input.making_charges,
        tax,
        discount: input.discount,
        total,
        paid_amount: input.paid_amount,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn line(name: &str, qty: i64, unit: i64) -> LineDraft {
        LineDraft {
            product_id: None,
            product_name: name.to_string(),
            quantity: qty,
            unit_price: Money::from_minor(unit),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("PJ", 1, "PJ/20240315-001")]
    #[case("PJ", 42, "PJ/20240315-042")]
    #[case("ORD", 999, "ORD/20240315-999")]
    #[case("ORD", 1000, "ORD/20240315-1000")]
    fn test_bill_number_format(#[case] prefix: &str, #[case] index: u32, #[case] expected: &str) {
        let number = BillNumber::new(prefix, day(2024, 3, 15), index);
        assert_eq!(number.to_string(), expected);
    }

    #[test]
    fn test_bill_number_parse() {
        let parsed: BillNumber = "ORD/20240101-012".parse().unwrap();
        assert_eq!(parsed, BillNumber::new("ORD", day(2024, 1, 1), 12));

        assert!("PJ-20240101-001".parse::<BillNumber>().is_err());
        assert!("PJ/2024011-001".parse::<BillNumber>().is_err());
        assert!("PJ/20240101-01".parse::<BillNumber>().is_err());
        assert!("PJ/20240101-000".parse::<BillNumber>().is_err());
    }

    #[test]
    fn test_file_safe_number() {
        assert_eq!(BillNumber::file_safe("PJ/20240315-007"), "PJ_20240315-007");
    }

    #[test]
    fn test_bill_day_uses_store_offset() {
        // 20:00 UTC on the 14th is 01:30 on the 15th in IST
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 20, 0, 0).unwrap();
        assert_eq!(bill_day(now, 330), day(2024, 3, 15));
        assert_eq!(bill_day(now, 0), day(2024, 3, 14));
        assert_eq!(bill_day(now, 100_000), day(2024, 3, 14));
    }

    #[test]
    fn test_price_lines() {
        let lines = price_lines(vec![line("Ring", 2, 150_000), line("Chain", 1, 99)]).unwrap();
        assert_eq!(lines[0].line_total.minor_units(), 300_000);
        assert_eq!(lines[1].line_total.minor_units(), 99);
    }

    #[rstest]
    #[case(vec![], "items")]
    #[case(vec![line("Ring", 0, 100)], "quantity")]
    #[case(vec![line("Ring", 1000, 100)], "quantity")]
    #[case(vec![line("  ", 1, 100)], "productName")]
    #[case(vec![line("Ring", 1, -1)], "unitPrice")]
    fn test_price_lines_rejects(#[case] drafts: Vec<LineDraft>, #[case] field: &str) {
        match price_lines(drafts) {
            Err(CoreError::Validation(v)) => assert_eq!(v.field(), field),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_price_lines_caps_line_count() {
        let drafts = (0..101).map(|i| line(&format!("Item {}", i), 1, 1)).collect();
        assert!(matches!(price_lines(drafts), Err(CoreError::Validation(_))));
    }

    #[rstest]
    #[case(Currency::Inr, "GST")]
    #[case(Currency::Bhd, "VAT")]
    fn test_total_identity_holds_for_both_currencies(
        #[case] currency: Currency,
        #[case] label: &str,
    ) {
        let lines = price_lines(vec![line("Bangle", 3, 12_345), line("Stud", 1, 5_000)]).unwrap();
        let input = TotalsInput {
            making_charges: Money::from_minor(2_000),
            tax: Some(Money::from_minor(1_111)),
            discount: Money::from_minor(500),
            ..Default::default()
        };

        let t = compute_totals(&lines, currency, &TaxRates::default(), &input).unwrap();

        assert_eq!(t.subtotal.minor_units(), 42_035);
        assert_eq!(t.total, t.subtotal + t.making_charges + t.tax - t.discount);
        assert_eq!(currency.tax_label(), label);
    }

    #[test]
    fn test_tax_defaults_to_configured_rate() {
        let lines = price_lines(vec![line("Anklet", 1, 12_345)]).unwrap();

        let inr = compute_totals(&lines, Currency::Inr, &TaxRates::default(), &TotalsInput::default())
            .unwrap();
        // 3% of 123.45 = 3.7035 → 3.70
        assert_eq!(inr.tax.minor_units(), 370);

        let bhd = compute_totals(&lines, Currency::Bhd, &TaxRates::default(), &TotalsInput::default())
            .unwrap();
        // 10% of 12.345 = 1.2345 → 1.235 (half-up in fils)
        assert_eq!(bhd.tax.minor_units(), 1_235);
    }

    #[test]
    fn test_claimed_figures_must_match() {
        let lines = price_lines(vec![line("Ring", 1, 10_000)]).unwrap();
        let rates = TaxRates::default();

        let wrong_subtotal = TotalsInput {
            claimed_subtotal: Some(Money::from_minor(9_999)),
            ..Default::default()
        };
        assert!(matches!(
            compute_totals(&lines, Currency::Inr, &rates, &wrong_subtotal),
            Err(CoreError::TotalsMismatch { .. })
        ));

        let right_total = TotalsInput {
            tax: Some(Money::zero()),
            claimed_subtotal: Some(Money::from_minor(10_000)),
            claimed_total: Some(Money::from_minor(10_000)),
            ..Default::default()
        };
        assert!(compute_totals(&lines, Currency::Inr, &rates, &right_total).is_ok());

        let wrong_total = TotalsInput {
            tax: Some(Money::zero()),
            claimed_total: Some(Money::from_minor(10_001)),
            ..Default::default()
        };
        assert!(matches!(
            compute_totals(&lines, Currency::Inr, &rates, &wrong_total),
            Err(CoreError::TotalsMismatch { .. })
        ));
    }

    #[test]
    fn test_discount_cannot_exceed_gross() {
        let lines = price_lines(vec![line("Ring", 1, 10_000)]).unwrap();
        let input = TotalsInput {
            tax: Some(Money::from_minor(300)),
            discount: Money::from_minor(10_301),
            ..Default::default()
        };
        assert!(matches!(
            compute_totals(&lines, Currency::Inr, &TaxRates::default(), &input),
            Err(CoreError::DiscountExceedsTotal { .. })
        ));

        let full = TotalsInput {
            discount: Money::from_minor(10_300),
            ..input
        };
        let t = compute_totals(&lines, Currency::Inr, &TaxRates::default(), &full).unwrap();
        assert!(t.total.is_zero());
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let lines = price_lines(vec![line("Ring", 1, 10_000)]).unwrap();
        let input = TotalsInput {
            making_charges: Money::from_minor(-1),
            ..Default::default()
        };
        assert!(matches!(
            compute_totals(&lines, Currency::Inr, &TaxRates::default(), &input),
            Err(CoreError::Validation(ValidationError::Negative { .. }))
        ));
    }

    #[test]
    fn test_balance_and_change() {
        let lines = price_lines(vec![line("Ring", 1, 10_000)]).unwrap();
        let rates = TaxRates::default();

        let part_paid = TotalsInput {
            tax: Some(Money::zero()),
            paid_amount: Money::from_minor(4_000),
            ..Default::default()
        };
        let t = compute_totals(&lines, Currency::Inr, &rates, &part_paid).unwrap();
        assert_eq!(t.balance_due().minor_units(), 6_000);
        assert!(t.change_due().is_zero());

        let over_paid = TotalsInput {
            paid_amount: Money::from_minor(12_000),
            ..part_paid
        };
        let t = compute_totals(&lines, Currency::Inr, &rates, &over_paid).unwrap();
        assert!(t.balance_due().is_zero());
        assert_eq!(t.change_due().minor_units(), 2_000);
    }
}

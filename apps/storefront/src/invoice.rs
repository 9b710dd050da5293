//! # Tax Invoice PDF
//!
//! Renders a stored bill as an A4 tax invoice.
//!
//! ## Page Layout (points, origin top-left)
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    [ logo 100×100 ]           y 50   │
//! │                     STORE NAME                y 170  │
//! │                      tagline                  y 190  │
//! │  TAX INVOICE                    CUSTOMER COPY y 220  │
//! │  Bill No / Date / Currency      printed at    y 245  │
//! │  ┌────────────────────┐  ┌────────────────────┐      │
//! │  │ store details      │  │ CUSTOMER DETAILS:  │ y 300│
//! │  └────────────────────┘  └────────────────────┘      │
//! │  Product        Qty   Price      Total        y 450  │
//! │  ...rows every 15pt, new page + header when full...  │
//! │                          Subtotal ... Balance Due    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Rendering is CPU-bound; handlers call it through `spawn_blocking`.
//! A logo that is missing or unreadable is logged and left out.

use std::path::Path;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use printpdf::image_crate;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};
use serde::Deserialize;
use tracing::{debug, warn};
use ts_rs::TS;

use jewel_core::billing::BillNumber;
use jewel_core::{Bill, Money};

use crate::config::StoreProfile;

const PAGE_W: f32 = 595.28;
const PAGE_H: f32 = 841.89;

const LEFT: f32 = 50.0;
const ROW_STEP: f32 = 15.0;
const BOTTOM_MARGIN: f32 = 60.0;

const ITEMS_TOP: f32 = 450.0;
const CONTINUED_TOP: f32 = 50.0;

const COL_PRODUCT: f32 = 50.0;
const COL_QTY: f32 = 200.0;
const COL_PRICE: f32 = 250.0;
const COL_TOTAL: f32 = 350.0;
const TOTALS_X: f32 = 300.0;

// Helvetica averages about half an em per glyph
const AVG_GLYPH_EM: f32 = 0.5;

/// Which copy of the invoice is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CopyKind {
    #[default]
    Customer,
    Store,
}

impl CopyKind {
    pub const fn label(&self) -> &'static str {
        match self {
            CopyKind::Customer => "CUSTOMER COPY",
            CopyKind::Store => "STORE COPY",
        }
    }
}

/// Invoice rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("PDF error: {0}")]
    Pdf(String),
}

impl From<printpdf::Error> for InvoiceError {
    fn from(err: printpdf::Error) -> Self {
        InvoiceError::Pdf(err.to_string())
    }
}

/// A finished PDF.
#[derive(Debug)]
pub struct RenderedInvoice {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// `Content-Disposition` file name: `{customer}_{bill number}.pdf`, ASCII only.
pub fn invoice_file_name(bill: &Bill) -> String {
    let customer = bill
        .customer_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let raw = format!("{}_{}.pdf", customer, BillNumber::file_safe(&bill.bill_number));

    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// =============================================================================
// Page Writer
// =============================================================================

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Draws on the current page in top-left point coordinates.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    pages: usize,
}

impl PageWriter {
    fn text(&self, text: &str, size: f32, x: f32, y: f32) {
        self.layer
            .use_text(text, size, mm(x), mm(PAGE_H - y - size), &self.regular);
    }

    fn bold(&self, text: &str, size: f32, x: f32, y: f32) {
        self.layer
            .use_text(text, size, mm(x), mm(PAGE_H - y - size), &self.bold);
    }

    fn centered_bold(&self, text: &str, size: f32, y: f32) {
        let width = text.chars().count() as f32 * size * AVG_GLYPH_EM;
        self.bold(text, size, ((PAGE_W - width) / 2.0).max(LEFT), y);
    }

    fn centered(&self, text: &str, size: f32, y: f32) {
        let width = text.chars().count() as f32 * size * AVG_GLYPH_EM;
        self.text(text, size, ((PAGE_W - width) / 2.0).max(LEFT), y);
    }

    fn rect(&self, x: f32, y: f32, w: f32, h: f32) {
        let corner = |px: f32, py: f32| (Point::new(mm(px), mm(PAGE_H - py)), false);
        self.layer.add_line(Line {
            points: vec![
                corner(x, y),
                corner(x + w, y),
                corner(x + w, y + h),
                corner(x, y + h),
            ],
            is_closed: true,
        });
    }

    fn rule(&self, x1: f32, x2: f32, y: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(x1), mm(PAGE_H - y)), false),
                (Point::new(mm(x2), mm(PAGE_H - y)), false),
            ],
            is_closed: false,
        });
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(mm(PAGE_W), mm(PAGE_H), "Invoice");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.layer.set_outline_thickness(0.5);
        self.pages += 1;
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Renders `bill` as a tax invoice.
pub fn render_invoice(
    bill: &Bill,
    store: &StoreProfile,
    logo: Option<&Path>,
    copy: CopyKind,
    printed_at: DateTime<Utc>,
) -> Result<RenderedInvoice, InvoiceError> {
    let title = format!("Invoice {}", bill.bill_number);
    let (doc, page, layer) = PdfDocument::new(&title, mm(PAGE_W), mm(PAGE_H), "Invoice");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let layer = doc.get_page(page).get_layer(layer);
    layer.set_outline_thickness(0.5);

    let mut w = PageWriter {
        doc,
        layer,
        regular,
        bold,
        pages: 1,
    };

    let offset = FixedOffset::east_opt(store.utc_offset_minutes * 60)
        .unwrap_or_else(|| Utc.fix());
    let created = bill.created_at.with_timezone(&offset);
    let printed = printed_at.with_timezone(&offset);
    let currency = bill.currency;

    if let Some(path) = logo {
        draw_logo(&w.layer, path);
    }

    // Header
    w.centered_bold(&store.name, 18.0, 170.0);
    w.centered(&store.tagline, 12.0, 190.0);

    w.bold("TAX INVOICE", 16.0, LEFT, 220.0);
    w.text(&format!("Bill No: {}", bill.bill_number), 10.0, LEFT, 245.0);
    w.text(&format!("Date: {}", created.format("%d/%m/%Y")), 10.0, LEFT, 260.0);
    w.text(&format!("Currency: {}", currency.code()), 10.0, LEFT, 275.0);

    w.bold(copy.label(), 12.0, 400.0, 220.0);
    w.text(&printed.format("%d/%m/%Y %H:%M").to_string(), 9.0, 400.0, 235.0);

    // Store and customer boxes
    w.rect(50.0, 300.0, 240.0, 120.0);
    w.rect(310.0, 300.0, 240.0, 120.0);

    let mut y = 310.0;
    w.bold(&store.name, 10.0, 60.0, y);
    let mut store_lines: Vec<String> = store.address_lines.clone();
    if !store.phone.is_empty() {
        store_lines.push(format!("Phone: {}", store.phone));
    }
    if !store.gstin.is_empty() {
        store_lines.push(format!("GSTIN: {}", store.gstin));
    }
    for line in store_lines.iter().take(6) {
        y += ROW_STEP;
        w.text(line, 10.0, 60.0, y);
    }

    w.bold("CUSTOMER DETAILS:", 10.0, 320.0, 310.0);
    w.text(&format!("Name: {}", bill.customer_name), 10.0, 320.0, 325.0);
    w.text(&format!("Email: {}", bill.customer_email), 10.0, 320.0, 340.0);
    w.text(&format!("Phone: {}", bill.customer_phone), 10.0, 320.0, 355.0);
    let address = wrap(&format!("Address: {}", bill.customer_address), chars_for(220.0, 10.0));
    for (i, line) in address.iter().take(3).enumerate() {
        w.text(line, 10.0, 320.0, 370.0 + i as f32 * ROW_STEP);
    }

    // Items
    let mut y = ITEMS_TOP;
    items_header(&w, y);
    y += ROW_STEP * 1.5;

    let name_chars = chars_for(COL_QTY - COL_PRODUCT - 8.0, 10.0);
    for item in &bill.items {
        if y + ROW_STEP > PAGE_H - BOTTOM_MARGIN {
            w.new_page();
            y = CONTINUED_TOP;
            items_header(&w, y);
            y += ROW_STEP * 1.5;
        }

        w.text(&truncate(&item.product_name, name_chars), 10.0, COL_PRODUCT, y);
        w.text(&item.quantity.to_string(), 10.0, COL_QTY, y);
        w.text(&item.unit_price().display(currency), 10.0, COL_PRICE, y);
        w.text(&item.line_total().display(currency), 10.0, COL_TOTAL, y);
        y += ROW_STEP;
    }

    // Totals
    let totals = bill.totals();
    let rows: [(String, Money, bool); 7] = [
        ("Subtotal".to_string(), totals.subtotal, false),
        ("Making Charges".to_string(), totals.making_charges, false),
        (currency.tax_label().to_string(), totals.tax, false),
        ("Discount".to_string(), totals.discount, false),
        ("Total".to_string(), totals.total, true),
        ("Paid".to_string(), totals.paid_amount, false),
        ("Balance Due".to_string(), totals.balance_due(), true),
    ];

    let block_height = ROW_STEP * (rows.len() as f32 + 1.0);
    if y + block_height > PAGE_H - BOTTOM_MARGIN {
        w.new_page();
        y = CONTINUED_TOP;
    } else {
        y += ROW_STEP / 2.0;
    }

    w.rule(TOTALS_X, PAGE_W - LEFT, y);
    y += ROW_STEP / 2.0;
    for (label, amount, strong) in &rows {
        let text = format!("{}: {}", label, amount.display(currency));
        if *strong {
            w.bold(&text, 11.0, TOTALS_X, y);
        } else {
            w.text(&text, 10.0, TOTALS_X, y);
        }
        y += ROW_STEP;
    }

    let pages = w.pages;
    let bytes = w.doc.save_to_bytes()?;

    debug!(bill_number = %bill.bill_number, pages, size = bytes.len(), "Invoice rendered");
    Ok(RenderedInvoice { bytes, pages })
}

fn items_header(w: &PageWriter, y: f32) {
    w.bold("Product", 11.0, COL_PRODUCT, y);
    w.bold("Qty", 11.0, COL_QTY, y);
    w.bold("Price", 11.0, COL_PRICE, y);
    w.bold("Total", 11.0, COL_TOTAL, y);
    w.rule(LEFT, PAGE_W - LEFT, y + ROW_STEP);
}

/// Places the logo centred at (250, 50), 100pt square.
fn draw_logo(layer: &PdfLayerReference, path: &Path) {
    let decoded = match image_crate::open(path) {
        Ok(img) => img,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Logo unreadable, rendering without it");
            return;
        }
    };

    let (px_w, px_h) = (decoded.width().max(1) as f32, decoded.height().max(1) as f32);
    let rgb = image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());
    let image = Image::from_dynamic_image(&rgb);

    // 72 dpi makes one pixel one point
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(250.0)),
            translate_y: Some(mm(PAGE_H - 50.0 - 100.0)),
            scale_x: Some(100.0 / px_w),
            scale_y: Some(100.0 / px_h),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
}

fn chars_for(width: f32, size: f32) -> usize {
    ((width / (size * AVG_GLYPH_EM)) as usize).max(1)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: String = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(head);
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use jewel_core::{BillItem, BillKind, Currency, PaymentMethod};

    fn bill(items: usize) -> Bill {
        let items = (0..items)
            .map(|i| BillItem {
                id: format!("item-{}", i),
                bill_id: "bill-1".to_string(),
                product_id: None,
                product_name: format!("Temple Necklace {}", i),
                quantity: 1,
                unit_price_minor: 2_500_000,
                line_total_minor: 2_500_000,
            })
            .collect::<Vec<_>>();
        let subtotal = 2_500_000 * items.len() as i64;

        Bill {
            id: "bill-1".to_string(),
            bill_number: "PJ/20240315-007".to_string(),
            kind: BillKind::Bill,
            customer_name: "Lakshmi Narayanan".to_string(),
            customer_email: "lakshmi@example.in".to_string(),
            customer_phone: "+91 98400 12345".to_string(),
            customer_address: "Flat 4B, Lotus Apartments, 17 Cathedral Road, Gopalapuram, Chennai 600086"
                .to_string(),
            currency: Currency::Inr,
            subtotal_minor: subtotal,
            making_charges_minor: 0,
            tax_minor: 0,
            discount_minor: 0,
            total_minor: subtotal,
            paid_minor: subtotal,
            payment_method: PaymentMethod::Cash,
            payment_reference: None,
            created_at: Utc::now(),
            items,
        }
    }

    fn render(bill: &Bill, logo: Option<&Path>) -> RenderedInvoice {
        render_invoice(bill, &StoreProfile::default(), logo, CopyKind::Customer, Utc::now()).unwrap()
    }

    #[test]
    fn test_renders_without_logo() {
        let out = render(&bill(3), None);

        assert!(out.bytes.starts_with(b"%PDF"));
        assert_eq!(out.pages, 1);
    }

    #[test]
    fn test_renders_with_logo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        image_crate::DynamicImage::new_rgb8(8, 8).save(&path).unwrap();

        let out = render(&bill(1), Some(&path));

        assert!(out.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_bad_logo_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("logo.png");
        std::fs::write(&garbage, b"definitely not a png").unwrap();

        assert!(render(&bill(1), Some(&garbage)).bytes.starts_with(b"%PDF"));
        assert!(render(&bill(1), Some(&dir.path().join("missing.png"))).bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_many_items_paginate() {
        // Twenty rows fit under the boxes on page one, ~47 on later pages
        assert_eq!(render(&bill(10), None).pages, 1);
        assert!(render(&bill(40), None).pages >= 2);
        assert!(render(&bill(150), None).pages >= 4);
    }

    #[test]
    fn test_invoice_file_name() {
        let mut b = bill(0);
        b.customer_name = "Lakshmi  Narayanan".to_string();
        assert_eq!(invoice_file_name(&b), "Lakshmi_Narayanan_PJ_20240315-007.pdf");

        b.customer_name = "Zoë \"Q\"".to_string();
        assert_eq!(invoice_file_name(&b), "Zo___Q__PJ_20240315-007.pdf");
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("Address: 17 Cathedral Road Gopalapuram Chennai", 16);
        assert!(lines.iter().all(|l| l.chars().count() <= 16));
        assert_eq!(lines.join(" "), "Address: 17 Cathedral Road Gopalapuram Chennai");
    }
}

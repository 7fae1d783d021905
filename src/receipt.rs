//! # Receipt Formatter
//!
//! Turns text and invoices into ESC/POS print jobs. Nothing here touches the
//! transport; the service writes what these functions return.
//!
//! ## Invoice Layout
//!
//! ```text
//!            FACTURA            (centered, double height)
//!          Folio: 1234
//!       Fecha: 2024-03-15
//!        Estado: Emitida
//! --------------------------------
//! CLIENTE                       (emphasized)
//! Nombre: Comercial Andes SpA
//! RUT: 76.123.456-7
//! --------------------------------
//!               TOTAL: $119.000 (right, emphasized double height)
//!   ¡Gracias por su preferencia!
//!       15-03-2024 10:30:00
//! ```

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::invoice::{CurrencyLocale, Invoice};
use crate::protocol::CommandStream;
use crate::protocol::text::{Alignment, PrintMode};

/// Characters of the source URL kept on the PDF notice.
pub const PDF_URL_PREFIX_CHARS: usize = 30;

/// Timestamp format printed on every job.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Printed in place of a missing invoice field.
const MISSING: &str = "-";

/// Fixed text and geometry of printed jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptLayout {
    pub title: String,
    pub thank_you: String,
    /// Locale for invoices that do not carry one.
    pub default_locale: CurrencyLocale,
    /// Characters per line in normal mode (32 on 58 mm paper).
    pub line_width: usize,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self {
            title: "FACTURA".to_string(),
            thank_you: "¡Gracias por su preferencia!".to_string(),
            default_locale: CurrencyLocale::EsCl,
            line_width: 32,
        }
    }
}

/// Builds print jobs with a given layout.
#[derive(Debug, Clone, Default)]
pub struct ReceiptFormatter {
    layout: ReceiptLayout,
}

impl ReceiptFormatter {
    pub fn new(layout: ReceiptLayout) -> Self {
        Self { layout }
    }

    /// Capability check page: one line per print mode.
    pub fn test_page(&self, printer_name: &str) -> String {
        self.test_page_at(printer_name, now())
    }

    pub fn test_page_at(&self, printer_name: &str, at: NaiveDateTime) -> String {
        CommandStream::new()
            .init()
            .align(Alignment::Center)
            .styled(PrintMode::DOUBLE_HEIGHT, "PRUEBA DE IMPRESION")
            .line("Factura Movil")
            .align(Alignment::Left)
            .rule('-', self.layout.line_width)
            .styled(PrintMode::NORMAL, "Texto normal")
            .styled(PrintMode::EMPHASIZED, "Texto enfatizado")
            .styled(PrintMode::LARGE, "Grande")
            .styled(PrintMode::DOUBLE_HEIGHT, "Doble alto")
            .styled(PrintMode::DOUBLE_WIDTH, "Doble ancho")
            .styled(PrintMode::LARGE_WIDE, "Grande ancho")
            .rule('-', self.layout.line_width)
            .field("Impresora", printer_name)
            .field("Fecha", &stamp(at))
            .align(Alignment::Center)
            .line("Impresora lista")
            .blank(3)
            .build()
    }

    /// Invoice receipt, or `None` when there is no invoice.
    pub fn invoice_receipt(&self, invoice: Option<&Invoice>) -> Option<String> {
        self.invoice_receipt_at(invoice, now())
    }

    pub fn invoice_receipt_at(&self, invoice: Option<&Invoice>, at: NaiveDateTime) -> Option<String> {
        let invoice = invoice?;
        let locale = invoice
            .locale
            .as_deref()
            .map(CurrencyLocale::parse)
            .unwrap_or(self.layout.default_locale);
        let folio = invoice
            .assigned_folio
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| MISSING.to_string());
        let total = invoice
            .total
            .map(|t| locale.format_amount(t))
            .unwrap_or_else(|| MISSING.to_string());

        let job = CommandStream::new()
            .init()
            // header
            .align(Alignment::Center)
            .styled(PrintMode::DOUBLE_HEIGHT, &self.layout.title)
            .field("Folio", &folio)
            .field("Fecha", invoice.date.as_deref().unwrap_or(MISSING))
            .field("Estado", invoice.state_label().unwrap_or(MISSING))
            // client
            .align(Alignment::Left)
            .rule('-', self.layout.line_width)
            .styled(PrintMode::EMPHASIZED, "CLIENTE")
            .field("Nombre", invoice.client_name().unwrap_or(MISSING))
            .field("RUT", invoice.client_rut().unwrap_or(MISSING))
            .rule('-', self.layout.line_width)
            // footer
            .align(Alignment::Right)
            .styled(
                PrintMode::DOUBLE_HEIGHT | PrintMode::EMPHASIZED,
                &format!("TOTAL: {total}"),
            )
            .align(Alignment::Center)
            .line(&self.layout.thank_you)
            .line(&stamp(at))
            .blank(3)
            .build();
        Some(job)
    }

    /// Notice printed instead of a PDF: conversion is not implemented.
    pub fn pdf_placeholder(&self, url: &str) -> String {
        CommandStream::new()
            .init()
            .align(Alignment::Center)
            .styled(PrintMode::EMPHASIZED, "DOCUMENTO PDF")
            .line("Impresion de PDF no implementada")
            .align(Alignment::Left)
            .field("Origen", &truncate_url(url))
            .blank(3)
            .build()
    }
}

/// Test page with the default layout, stamped now.
pub fn format_test_page(printer_name: &str) -> String {
    ReceiptFormatter::default().test_page(printer_name)
}

/// Invoice receipt with the default layout; `None` without an invoice.
pub fn format_invoice_receipt(invoice: Option<&Invoice>) -> Option<String> {
    ReceiptFormatter::default().invoice_receipt(invoice)
}

pub fn format_pdf_placeholder(url: &str) -> String {
    ReceiptFormatter::default().pdf_placeholder(url)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn stamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// First [`PDF_URL_PREFIX_CHARS`] characters, with `...` when cut.
fn truncate_url(url: &str) -> String {
    match url.char_indices().nth(PDF_URL_PREFIX_CHARS) {
        Some((cut, _)) => format!("{}...", &url[..cut]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{Client, InvoiceState, Scalar};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn invoice() -> Invoice {
        Invoice {
            assigned_folio: Some(Scalar::Int(1234)),
            date: Some("2024-03-15".into()),
            state: Some(InvoiceState(Scalar::Int(1), "Emitida".into())),
            client: Some(Client {
                name: Some("Comercial Andes SpA".into()),
                rut: Some("76.123.456-7".into()),
            }),
            total: Some(119000.0),
            locale: None,
        }
    }

    #[test]
    fn test_invoice_receipt_exact_stream() {
        let layout = ReceiptLayout {
            line_width: 8,
            ..ReceiptLayout::default()
        };
        let job = ReceiptFormatter::new(layout)
            .invoice_receipt_at(Some(&invoice()), at())
            .unwrap();
        let expected = concat!(
            "\x1B@",
            "\x1Ba\x01",
            "\x1B!\x10FACTURA\r\n\x1B!\x00",
            "Folio: 1234\r\n",
            "Fecha: 2024-03-15\r\n",
            "Estado: Emitida\r\n",
            "\x1Ba\x00",
            "--------\r\n",
            "\x1B!\x08CLIENTE\r\n\x1B!\x00",
            "Nombre: Comercial Andes SpA\r\n",
            "RUT: 76.123.456-7\r\n",
            "--------\r\n",
            "\x1Ba\x02",
            "\x1B!\x18TOTAL: $119.000\r\n\x1B!\x00",
            "\x1Ba\x01",
            "¡Gracias por su preferencia!\r\n",
            "15-03-2024 10:30:00\r\n",
            "\r\n\r\n\r\n",
        );
        assert_eq!(job, expected);
    }

    #[test]
    fn test_invoice_receipt_is_deterministic() {
        let f = ReceiptFormatter::default();
        let a = f.invoice_receipt_at(Some(&invoice()), at());
        let b = f.invoice_receipt_at(Some(&invoice()), at());
        assert_eq!(a, b);
    }

    #[test]
    fn test_invoice_receipt_contains_identifiers() {
        let job = format_invoice_receipt(Some(&invoice())).unwrap();
        assert!(job.contains("1234"));
        assert!(job.contains("Comercial Andes SpA"));
        assert!(job.contains("76.123.456-7"));
    }

    #[test]
    fn test_absent_invoice() {
        assert_eq!(format_invoice_receipt(None), None);
    }

    #[test]
    fn test_missing_fields_print_dash() {
        let job = ReceiptFormatter::default()
            .invoice_receipt_at(Some(&Invoice::default()), at())
            .unwrap();
        assert!(job.contains("Folio: -\r\n"));
        assert!(job.contains("RUT: -\r\n"));
        assert!(job.contains("TOTAL: -\r\n"));
    }

    #[test]
    fn test_invoice_locale_overrides_default() {
        let mut inv = invoice();
        inv.locale = Some("en-US".into());
        inv.total = Some(1234.5);
        let job = ReceiptFormatter::default()
            .invoice_receipt_at(Some(&inv), at())
            .unwrap();
        assert!(job.contains("TOTAL: $1,234.50"));
    }

    #[test]
    fn test_test_page_exercises_every_mode() {
        let page = ReceiptFormatter::default().test_page_at("Woosim WSP-i450", at());
        for mode in [0x00u8, 0x08, 0x10, 0x20, 0x30, 0x38] {
            let cmd = format!("\x1B!{}", char::from(mode));
            assert!(page.contains(&cmd), "missing mode {mode:#04x}");
        }
        assert!(page.contains("Impresora: Woosim WSP-i450\r\n"));
        assert!(page.contains("Fecha: 15-03-2024 10:30:00\r\n"));
        assert!(page.starts_with("\x1B@"));
    }

    #[test]
    fn test_pdf_placeholder_truncates_url() {
        let url = "https://api.facturamovil.cl/documents/12345/pdf";
        let notice = format_pdf_placeholder(url);
        assert!(notice.contains("Origen: https://api.facturamovil.cl/do...\r\n"));
        assert!(notice.contains("no implementada"));
    }

    #[test]
    fn test_pdf_placeholder_short_url_untouched() {
        let notice = format_pdf_placeholder("file:///a.pdf");
        assert!(notice.contains("Origen: file:///a.pdf\r\n"));
    }

    #[test]
    fn test_truncate_url_multibyte() {
        let url = "ñ".repeat(40);
        assert_eq!(truncate_url(&url), format!("{}...", "ñ".repeat(30)));
    }
}

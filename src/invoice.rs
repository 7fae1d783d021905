//! Invoice records as returned by the Factura Móvil API.
//!
//! Only the fields the receipt prints are modelled:
//!
//! ```json
//! {
//!   "assignedFolio": 1234,
//!   "date": "2024-03-15",
//!   "state": [1, "Emitida"],
//!   "client": { "name": "Comercial Andes SpA", "rut": "76.123.456-7" },
//!   "total": 119000
//! }
//! ```
//!
//! Every field is optional; the formatter prints `-` for missing values.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A value the API sends either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    /// Whole-valued floats (`1234.0`) print without decimals.
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) if x.fract() == 0.0 => write!(f, "{x:.0}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// `[code, label]`, e.g. `[1, "Emitida"]`. Only the label is printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceState(pub Scalar, pub String);

impl InvoiceState {
    pub fn label(&self) -> &str {
        &self.1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name: Option<String>,
    /// Chilean tax id (RUT).
    pub rut: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub assigned_folio: Option<Scalar>,
    pub date: Option<String>,
    pub state: Option<InvoiceState>,
    pub client: Option<Client>,
    /// Number or numeric string (`119000`, `"119000"`, `"1234.50"`).
    #[serde(default, deserialize_with = "number_or_text")]
    pub total: Option<f64>,
    /// Currency locale tag such as `es-CL`.
    pub locale: Option<String>,
}

impl Invoice {
    pub fn client_name(&self) -> Option<&str> {
        self.client.as_ref()?.name.as_deref()
    }

    pub fn client_rut(&self) -> Option<&str> {
        self.client.as_ref()?.rut.as_deref()
    }

    pub fn state_label(&self) -> Option<&str> {
        self.state.as_ref().map(InvoiceState::label)
    }
}

fn number_or_text<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Option::<Amount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Amount::Number(n)) => Ok(Some(n)),
        Some(Amount::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid amount {text:?}")))
        }
    }
}

/// Locales the receipt knows how to print amounts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrencyLocale {
    /// Chilean pesos: `$1.234.568`
    #[default]
    #[serde(rename = "es-CL")]
    EsCl,
    /// US dollars: `$1,234,567.89`
    #[serde(rename = "en-US")]
    EnUs,
}

impl CurrencyLocale {
    /// Parse a locale tag; unknown tags fall back to `es-CL`.
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().replace('_', "-").as_str() {
            "en-us" | "en" => Self::EnUs,
            "es-cl" | "es" => Self::EsCl,
            other => {
                tracing::debug!(locale = other, "unknown currency locale, using es-CL");
                Self::EsCl
            }
        }
    }

    /// Format an amount with this locale's grouping and decimals.
    pub fn format_amount(self, amount: f64) -> String {
        match self {
            Self::EsCl => {
                let units = amount.round();
                let sign = if units < 0.0 { "-" } else { "" };
                format!("{sign}${}", group_thousands(units.abs() as u64, '.'))
            }
            Self::EnUs => {
                let cents = (amount * 100.0).round();
                let sign = if cents < 0.0 { "-" } else { "" };
                let cents = cents.abs() as u64;
                format!(
                    "{sign}${}.{:02}",
                    group_thousands(cents / 100, ','),
                    cents % 100
                )
            }
        }
    }
}

fn group_thousands(value: u64, sep: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

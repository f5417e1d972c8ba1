//! Price normalization from shop-formatted strings to USD
//!
//! Shops print prices like `5.00 грн.`, `$25,000` or `$.50`. The first number
//! in the string is taken, read with the source's decimal mark, converted with
//! the source's rate and floored at [`MIN_PRICE`] so overpay ratios never
//! divide by zero.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lowest price any listing may carry
pub const MIN_PRICE: f64 = 0.01;

lazy_static! {
    static ref PRICE_NUMBER: Regex =
        Regex::new(r"-?(?:\d+(?:[ \u{a0}]\d{3})*(?:[.,]\d+)*|[.,]\d+)")
            .expect("valid price regex");
}

fn default_decimal_mark() -> char {
    '.'
}

/// How a source's prices map onto USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRule {
    pub code: String,
    /// Source currency units per one USD
    pub units_per_usd: f64,
    /// `.` or `,`; the other separator only groups thousands
    #[serde(default = "default_decimal_mark")]
    pub decimal_mark: char,
}

impl CurrencyRule {
    pub fn new(code: &str, units_per_usd: f64) -> Self {
        Self {
            code: code.to_string(),
            units_per_usd,
            decimal_mark: default_decimal_mark(),
        }
    }

    pub fn with_decimal_mark(mut self, mark: char) -> Self {
        self.decimal_mark = mark;
        self
    }

    pub fn usd() -> Self {
        Self::new("USD", 1.0)
    }

    /// Hryvnia as the Ukrainian shops print it (`5.00 грн`)
    pub fn uah(units_per_usd: f64) -> Self {
        Self::new("UAH", units_per_usd)
    }
}

impl Default for CurrencyRule {
    fn default() -> Self {
        Self::usd()
    }
}

/// Convert a raw price string into a USD amount, never below [`MIN_PRICE`]
///
/// Malformed strings count as zero-priced listings.
pub fn to_canonical_price(raw: &str, rule: &CurrencyRule) -> f64 {
    let converted = match parse_amount(raw, rule.decimal_mark) {
        Some(amount) if rule.units_per_usd > 0.0 => amount / rule.units_per_usd,
        _ => 0.0,
    };

    if converted.is_finite() && converted > 0.0 {
        converted
    } else {
        MIN_PRICE
    }
}

/// Parse the first number in a price string
pub fn parse_amount(raw: &str, decimal_mark: char) -> Option<f64> {
    let found = PRICE_NUMBER.find(raw)?.as_str();
    let compact: String = found
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .collect();
    normalize_decimal(&compact, decimal_mark).parse().ok()
}

/// Rewrite a number into `1234.56` form
///
/// A decimal mark that occurs more than once is read as grouping, as in
/// `1.250.000`.
fn normalize_decimal(number: &str, decimal_mark: char) -> String {
    let decimal = match number.matches(decimal_mark).count() {
        1 => number.rfind(decimal_mark),
        _ => None,
    };

    let mut out: String = number
        .char_indices()
        .filter_map(|(i, ch)| match ch {
            '.' | ',' if Some(i) == decimal => Some('.'),
            '.' | ',' => None,
            _ => Some(ch),
        })
        .collect();

    if out.starts_with('.') || out.starts_with("-.") {
        out.insert(out.find('.').unwrap_or(0), '0');
    }
    out
}

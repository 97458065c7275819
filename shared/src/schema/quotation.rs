//! Price quotation for a custom order.
//!
//! Defaults come from the caller's [`QuotationRequest`]: the cost-plus
//! baseline price is what a quotation falls back to whenever the model's
//! numbers are missing or unusable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use super::{round2, Coerce, Fields, Normalize};
use crate::dto::QuotationRequest;

pub const MAX_QUANTITY: i64 = 100_000;
pub const MAX_UNIT_PRICE: f64 = 10_000_000.0;
pub const MAX_TOTAL_PRICE: f64 = 1e12;
pub const MAX_DISCOUNT_PERCENT: f64 = 50.0;
pub const MAX_TAX_PERCENT: f64 = 30.0;
pub const DEFAULT_VALIDITY_DAYS: i64 = 15;
pub const DEFAULT_TERMS: &[&str] = &[
    "50% advance, balance on delivery",
    "Delivery in 7-10 working days",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PricingTier {
    Budget,
    #[default]
    Standard,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub tax_percent: f64,
    pub total_price: f64,
    pub currency: String,
    pub pricing_tier: PricingTier,
    pub validity_days: u32,
    pub line_items: Vec<LineItem>,
    pub terms: Vec<String>,
    pub notes: String,
    pub fallback: bool,
}

/// `unit × qty`, less discount, plus tax.
pub fn quoted_total(unit_price: f64, quantity: u32, discount_percent: f64, tax_percent: f64) -> f64 {
    let net = unit_price * f64::from(quantity) * (1.0 - discount_percent / 100.0);
    round2(net * (1.0 + tax_percent / 100.0))
}

fn currency_code(s: &str) -> Option<String> {
    let s = s.trim();
    (s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic())).then(|| s.to_ascii_uppercase())
}

impl Normalize for Quotation {
    type Context = QuotationRequest;

    fn normalize(payload: Option<&Value>, req: &QuotationRequest) -> Self {
        let f = Fields::new(payload);
        let quantity = f.integer(
            "quantity",
            1..=MAX_QUANTITY,
            i64::from(req.quantity).clamp(1, MAX_QUANTITY),
            Coerce::FromString,
        ) as u32;
        let unit_price = f.number(
            "unitPrice",
            0.0..=MAX_UNIT_PRICE,
            req.baseline_unit_price().clamp(0.0, MAX_UNIT_PRICE),
            Coerce::FromString,
        );
        let discount_percent = f.number("discountPercent", 0.0..=MAX_DISCOUNT_PERCENT, 0.0, Coerce::Never);
        let tax_percent = f.number(
            "taxPercent",
            0.0..=MAX_TAX_PERCENT,
            req.tax_percent.clamp(0.0, MAX_TAX_PERCENT),
            Coerce::Never,
        );
        let total_price = f.number(
            "totalPrice",
            0.0..=MAX_TOTAL_PRICE,
            quoted_total(unit_price, quantity, discount_percent, tax_percent).min(MAX_TOTAL_PRICE),
            Coerce::FromString,
        );
        let product_name = f.text("productName", &req.product_name);
        let default_items = || {
            vec![LineItem {
                description: format!("{} × {}", product_name, quantity),
                amount: round2(unit_price * f64::from(quantity)),
            }]
        };

        Quotation {
            quantity,
            unit_price,
            discount_percent,
            tax_percent,
            total_price,
            currency: f
                .get_str("currency")
                .and_then(currency_code)
                .or_else(|| currency_code(&req.currency))
                .unwrap_or_else(|| "INR".to_string()),
            pricing_tier: f.member("pricingTier", PricingTier::default()),
            validity_days: f.integer("validityDays", 1..=90, DEFAULT_VALIDITY_DAYS, Coerce::FromString) as u32,
            line_items: f.records(
                "lineItems",
                |item| {
                    let description = item.get_str("description")?;
                    let amount = item.get_f64("amount")?;
                    (!description.trim().is_empty() && amount >= 0.0).then(|| LineItem {
                        description: description.to_string(),
                        amount,
                    })
                },
                default_items,
            ),
            terms: f.strings("terms", DEFAULT_TERMS),
            notes: f.any_text("notes", ""),
            product_name,
            fallback: false,
        }
    }

    fn fallback(reason: &str, req: &QuotationRequest) -> Self {
        Quotation {
            notes: reason.to_string(),
            fallback: true,
            ..Quotation::normalize(None, req)
        }
    }
}

//! Fixed-shape result records and the field-level rules that coerce an
//! arbitrary parsed payload into them.

pub mod business;
pub mod enhancement;
pub mod quotation;

use std::ops::RangeInclusive;
use std::str::FromStr;

use serde_json::{Map, Value};

pub use business::{BusinessAnalysis, RecommendedSolution, SolutionId};
pub use enhancement::{Enhancement, EnhancementAnalysis};
pub use quotation::{LineItem, PricingTier, Quotation};

/// A result record that can be built from untrusted model output.
///
/// Both constructors are total: whatever the payload looks like, the returned
/// record satisfies every field's type and domain.
pub trait Normalize: Sized {
    /// Request-specific input some schemas derive their defaults from.
    type Context;

    fn normalize(payload: Option<&Value>, ctx: &Self::Context) -> Self;

    /// Canned record with `fallback` set and `reason` in the designated field.
    fn fallback(reason: &str, ctx: &Self::Context) -> Self;
}

/// Whether a field may be coerced from a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coerce {
    Never,
    FromString,
}

/// Read-only view over the object being normalized. A missing or non-object
/// payload behaves like an empty object.
#[derive(Clone, Copy)]
pub(crate) struct Fields<'a>(Option<&'a Map<String, Value>>);

impl<'a> Fields<'a> {
    pub(crate) fn new(payload: Option<&'a Value>) -> Self {
        Fields(payload.and_then(Value::as_object))
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.and_then(|map| map.get(key))
    }

    pub(crate) fn nested(&self, key: &str) -> Fields<'a> {
        Fields::new(self.get(key))
    }

    /// Non-blank string kept verbatim, else the default.
    pub(crate) fn text(&self, key: &str, default: &str) -> String {
        match self.get(key).and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => default.to_string(),
        }
    }

    /// Any string (blank included) kept verbatim, else the default.
    pub(crate) fn any_text(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub(crate) fn integer(
        &self,
        key: &str,
        domain: RangeInclusive<i64>,
        default: i64,
        coerce: Coerce,
    ) -> i64 {
        let raw = match self.get(key) {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Some(Value::String(s)) if coerce == Coerce::FromString => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        raw.map_or(default, |v| v.clamp(*domain.start(), *domain.end()))
    }

    pub(crate) fn number(
        &self,
        key: &str,
        domain: RangeInclusive<f64>,
        default: f64,
        coerce: Coerce,
    ) -> f64 {
        let raw = match self.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) if coerce == Coerce::FromString => {
                s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
            }
            _ => None,
        };
        raw.map_or(default, |v| v.clamp(*domain.start(), *domain.end()))
    }

    /// Non-blank strings of the array; the default when none survive.
    pub(crate) fn strings(&self, key: &str, default: &[&str]) -> Vec<String> {
        let kept: Vec<String> = self
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if kept.is_empty() {
            default.iter().map(|s| s.to_string()).collect()
        } else {
            kept
        }
    }

    /// Membership check against an allow-list enum.
    pub(crate) fn member<E: FromStr>(&self, key: &str, default: E) -> E {
        self.get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Allow-listed members of the array, first occurrence wins; the default
    /// when none survive.
    pub(crate) fn members<E: FromStr + PartialEq + Clone>(&self, key: &str, default: &[E]) -> Vec<E> {
        let mut kept: Vec<E> = Vec::new();
        for item in self.get(key).and_then(Value::as_array).into_iter().flatten() {
            if let Some(v) = item.as_str().and_then(|s| s.trim().parse::<E>().ok()) {
                if !kept.contains(&v) {
                    kept.push(v);
                }
            }
        }
        if kept.is_empty() {
            default.to_vec()
        } else {
            kept
        }
    }

    /// Array elements accepted by `keep`; the default when none survive.
    pub(crate) fn records<T>(
        &self,
        key: &str,
        keep: impl Fn(Fields<'a>) -> Option<T>,
        default: impl FnOnce() -> Vec<T>,
    ) -> Vec<T> {
        let kept: Vec<T> = self
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| keep(Fields::new(Some(v)))).collect())
            .unwrap_or_default();
        if kept.is_empty() {
            default()
        } else {
            kept
        }
    }

    pub(crate) fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    pub(crate) fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

/// Round to two decimals, the precision prices are quoted in.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

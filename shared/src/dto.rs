use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Uniform response of every analysis use case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEnvelope<T> {
    pub success: bool,
    pub data: T,
    /// True when `data` is canned rather than derived from model output.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_upstream_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRequest {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppSendRequest {
    pub to: String,
    pub message: String,
}

fn default_overhead_percent() -> f64 {
    10.0
}

fn default_margin_percent() -> f64 {
    30.0
}

fn default_currency() -> String {
    "INR".into()
}

/// Pricing inputs for a custom order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationRequest {
    pub product_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub material_cost: f64,
    #[serde(default)]
    pub labor_hours: f64,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default = "default_overhead_percent")]
    pub overhead_percent: f64,
    #[serde(default = "default_margin_percent")]
    pub margin_percent: f64,
    #[serde(default)]
    pub tax_percent: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Free-form requirements from the customer (size, colours, deadline).
    #[serde(default)]
    pub requirements: Option<String>,
}

impl QuotationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.product_name.trim().is_empty() {
            return Err(AppError::Validation("productName is required".into()));
        }
        if !(1..=100_000).contains(&self.quantity) {
            return Err(AppError::Validation("quantity must be between 1 and 100000".into()));
        }
        let amounts = [
            ("materialCost", self.material_cost),
            ("laborHours", self.labor_hours),
            ("hourlyRate", self.hourly_rate),
            ("overheadPercent", self.overhead_percent),
            ("marginPercent", self.margin_percent),
            ("taxPercent", self.tax_percent),
        ];
        for (name, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Validation(format!("{name} must be a non-negative number")));
            }
        }
        if self.tax_percent > 30.0 {
            return Err(AppError::Validation("taxPercent must not exceed 30".into()));
        }
        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::Validation("currency must be a 3-letter code".into()));
        }
        Ok(())
    }

    /// Cost-plus unit price: materials and labour, plus overhead, plus margin.
    pub fn baseline_unit_price(&self) -> f64 {
        let cost = self.material_cost + self.labor_hours * self.hourly_rate;
        let unit = cost * (1.0 + self.overhead_percent / 100.0) * (1.0 + self.margin_percent / 100.0);
        (unit * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_and_validation() {
        let req: QuotationRequest =
            serde_json::from_value(json!({"productName": "Basket", "quantity": 3, "materialCost": 40}))
                .unwrap();
        assert_eq!(req.currency, "INR");
        assert_eq!(req.overhead_percent, 10.0);
        assert!(req.validate().is_ok());
        // 40 * 1.1 * 1.3
        assert_eq!(req.baseline_unit_price(), 57.2);
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let base = json!({"productName": "Basket", "quantity": 3});
        let mut blank = base.clone();
        blank["productName"] = json!("  ");
        let mut zero = base.clone();
        zero["quantity"] = json!(0);
        let mut negative = base.clone();
        negative["hourlyRate"] = json!(-1.0);
        let mut currency = base;
        currency["currency"] = json!("rupees");
        for case in [blank, zero, negative, currency] {
            let req: QuotationRequest = serde_json::from_value(case).unwrap();
            assert!(matches!(req.validate(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn envelope_skips_absent_optionals() {
        let env = AnalysisEnvelope {
            success: true,
            data: json!({}),
            fallback: false,
            raw_upstream_text: None,
            error: None,
        };
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v, json!({"success": true, "data": {}, "fallback": false}));
    }
}

//! Prompt templates. Each one asks for a single JSON object using the wire
//! names the normalizers read.

use crate::dto::QuotationRequest;
use crate::schema::{BusinessAnalysis, Enhancement};
use crate::upstream::ImageFeatures;

pub fn business_prompt(description: &str) -> String {
    format!(
        r#"A craft maker described their business in their own words:

"{}"

Analyse the business and reply with ONLY a JSON object of this shape:
{{
  "businessType": "short name of the craft business",
  "confidence": 0-100,
  "products": ["product", ...],
  "targetCustomers": ["customer group", ...],
  "problems": ["problem the owner faces", ...],
  "recommendedSolution": {{ "id": "website" | "whatsapp" | "instagram", "reason": "one sentence" }},
  "summary": "two sentences at most"
}}"#,
        description.trim()
    )
}

fn enhancement_ids() -> String {
    [
        Enhancement::AutoBrightness,
        Enhancement::AutoContrast,
        Enhancement::AutoColor,
        Enhancement::Sharpen,
        Enhancement::RemoveBackground,
        Enhancement::Upscale,
    ]
    .iter()
    .map(|e| format!("\"{}\"", e.as_ref()))
    .collect::<Vec<_>>()
    .join(" | ")
}

pub fn enhancement_prompt(features: Option<&ImageFeatures>, business: Option<&BusinessAnalysis>) -> String {
    let mut prompt = String::from(
        "You are reviewing a product photo a craft maker wants to sell online.\n",
    );
    if let Some(b) = business {
        prompt.push_str(&format!(
            "The seller runs a {} business selling {}.\n",
            b.business_type,
            b.products.join(", ")
        ));
    }
    if let Some(f) = features {
        if !f.labels.is_empty() {
            let labels: Vec<&str> = f.labels.iter().map(|l| l.description.as_str()).collect();
            prompt.push_str(&format!("Detected labels: {}.\n", labels.join(", ")));
        }
        if !f.objects.is_empty() {
            prompt.push_str(&format!("Detected objects: {}.\n", f.objects.join(", ")));
        }
        if !f.dominant_colors.is_empty() {
            prompt.push_str(&format!("Dominant colours: {}.\n", f.dominant_colors.join(", ")));
        }
    }
    prompt.push_str(&format!(
        r#"
Reply with ONLY a JSON object of this shape:
{{
  "qualityScore": 0-100,
  "productCategory": "category of the product",
  "issues": ["photo problem", ...],
  "enhancements": [{}],
  "backgroundSuggestion": "one sentence",
  "caption": "short sales caption"
}}"#,
        enhancement_ids()
    ));
    prompt
}

pub fn quotation_prompt(req: &QuotationRequest) -> String {
    let mut details = format!(
        "Product: {}\nQuantity: {}\nMaterial cost per unit: {:.2}\nLabour: {} hours at {:.2} per hour\n\
         Overhead: {}%\nTarget margin: {}%\nTax: {}%\nCurrency: {}\nBaseline unit price: {:.2}\n",
        req.product_name.trim(),
        req.quantity,
        req.material_cost,
        req.labor_hours,
        req.hourly_rate,
        req.overhead_percent,
        req.margin_percent,
        req.tax_percent,
        req.currency.trim().to_uppercase(),
        req.baseline_unit_price(),
    );
    if let Some(customer) = req.customer_name.as_deref().filter(|c| !c.trim().is_empty()) {
        details.push_str(&format!("Customer: {}\n", customer.trim()));
    }
    if let Some(reqs) = req.requirements.as_deref().filter(|r| !r.trim().is_empty()) {
        details.push_str(&format!("Requirements: {}\n", reqs.trim()));
    }
    format!(
        r#"Prepare a price quotation for a handmade order.

{details}
Stay close to the baseline unit price unless the requirements justify a change.
Reply with ONLY a JSON object of this shape:
{{
  "unitPrice": number,
  "discountPercent": 0-50,
  "pricingTier": "budget" | "standard" | "premium",
  "validityDays": number,
  "lineItems": [{{ "description": "text", "amount": number }}, ...],
  "terms": ["term", ...],
  "notes": "one sentence"
}}"#
    )
}

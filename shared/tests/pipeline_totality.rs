use proptest::prelude::*;
use shared::dto::QuotationRequest;
use shared::pipeline::{process_response, Stage};
use shared::schema::{BusinessAnalysis, EnhancementAnalysis, Quotation};

fn request() -> QuotationRequest {
    serde_json::from_value(serde_json::json!({"productName": "Mat", "quantity": 4, "materialCost": 25}))
        .unwrap()
}

/// Fragments models actually emit: fences, prose, half objects, relaxed syntax.
fn model_text() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        Just("```json\n".to_string()),
        Just("```".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just("[".to_string()),
        Just(",".to_string()),
        Just("'".to_string()),
        Just("\"".to_string()),
        Just("confidence: 120".to_string()),
        Just("'businessType': 'Pottery'".to_string()),
        Just("\"qualityScore\": \"87\"".to_string()),
        Just("unitPrice: -5".to_string()),
        "[a-zA-Z :]{0,12}",
        any::<String>(),
    ];
    prop::collection::vec(fragment, 0..12).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn business_pipeline_is_total(raw in model_text()) {
        let out = process_response::<BusinessAnalysis>(raw, &());
        prop_assert!(out.result.confidence <= 100);
        prop_assert!(!out.result.business_type.trim().is_empty());
        prop_assert_eq!(out.result.fallback, out.failure.is_some());
        prop_assert_eq!(out.path.first(), Some(&Stage::CallUpstream));
        let last = out.path.last().copied();
        prop_assert!(last == Some(Stage::Normalize) || last == Some(Stage::Fallback));
    }

    #[test]
    fn enhancement_pipeline_is_total(raw in model_text()) {
        let out = process_response::<EnhancementAnalysis>(raw, &());
        prop_assert!(out.result.quality_score <= 100);
        prop_assert!(!out.result.enhancements.is_empty());
        prop_assert!(out.path.iter().filter(|s| **s == Stage::Repair).count() <= 1);
    }

    #[test]
    fn quotation_pipeline_is_total(raw in model_text()) {
        let out = process_response::<Quotation>(raw, &request());
        prop_assert!(out.result.unit_price >= 0.0);
        prop_assert!(out.result.total_price >= 0.0);
        prop_assert!((1..=100_000).contains(&out.result.quantity));
        prop_assert!(out.result.discount_percent <= 50.0);
        prop_assert_eq!(out.result.currency.len(), 3);
    }
}

#[test]
fn degenerate_inputs_fall_back() {
    for raw in ["", "   ", "no braces here", "}{", "```json\n```"] {
        let out = process_response::<BusinessAnalysis>(raw.to_string(), &());
        assert!(out.result.fallback, "{raw:?}");
        assert_eq!(out.result.problems[0], "no JSON");
    }
}

//! Business analysis derived from the owner's spoken description.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use super::{Coerce, Fields, Normalize};

pub const DEFAULT_BUSINESS_TYPE: &str = "Handicraft Business";
pub const DEFAULT_CONFIDENCE: u8 = 50;
pub const DEFAULT_PRODUCTS: &[&str] = &["Handcrafted products"];
pub const DEFAULT_TARGET_CUSTOMERS: &[&str] = &["Local customers", "Gift buyers"];
pub const DEFAULT_PROBLEMS: &[&str] = &["Limited online visibility"];
pub const DEFAULT_SOLUTION_REASON: &str =
    "WhatsApp Business is the quickest way to reach existing customers.";
pub const DEFAULT_SUMMARY: &str = "A small craft business looking to reach more customers.";

/// Channels the frontend knows how to set up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SolutionId {
    Website,
    #[default]
    Whatsapp,
    Instagram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedSolution {
    pub id: SolutionId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAnalysis {
    pub business_type: String,
    /// 0..=100
    pub confidence: u8,
    pub products: Vec<String>,
    pub target_customers: Vec<String>,
    pub problems: Vec<String>,
    pub recommended_solution: RecommendedSolution,
    pub summary: String,
    pub fallback: bool,
}

impl Normalize for BusinessAnalysis {
    type Context = ();

    fn normalize(payload: Option<&Value>, _: &()) -> Self {
        let f = Fields::new(payload);
        let solution = f.nested("recommendedSolution");
        BusinessAnalysis {
            business_type: f.text("businessType", DEFAULT_BUSINESS_TYPE),
            confidence: f.integer("confidence", 0..=100, DEFAULT_CONFIDENCE.into(), Coerce::FromString)
                as u8,
            products: f.strings("products", DEFAULT_PRODUCTS),
            target_customers: f.strings("targetCustomers", DEFAULT_TARGET_CUSTOMERS),
            problems: f.strings("problems", DEFAULT_PROBLEMS),
            recommended_solution: RecommendedSolution {
                id: solution.member("id", SolutionId::default()),
                reason: solution.text("reason", DEFAULT_SOLUTION_REASON),
            },
            summary: f.text("summary", DEFAULT_SUMMARY),
            fallback: false,
        }
    }

    fn fallback(reason: &str, _: &()) -> Self {
        let mut problems = vec![reason.to_string()];
        problems.extend(DEFAULT_PROBLEMS.iter().map(|s| s.to_string()));
        BusinessAnalysis {
            problems,
            fallback: true,
            ..BusinessAnalysis::normalize(None, &())
        }
    }
}

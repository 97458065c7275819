//! Product photo assessment plus the image-CDN effects that would improve it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use super::{Coerce, Fields, Normalize};

pub const DEFAULT_QUALITY_SCORE: u8 = 60;
pub const DEFAULT_CATEGORY: &str = "Handcrafted item";
pub const DEFAULT_ISSUES: &[&str] = &["Lighting could be more even"];
pub const DEFAULT_ENHANCEMENTS: &[Enhancement] = &[Enhancement::AutoBrightness, Enhancement::AutoContrast];
pub const DEFAULT_BACKGROUND: &str = "Plain white or neutral background";
pub const DEFAULT_CAPTION: &str = "Handmade with care.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Enhancement {
    AutoBrightness,
    AutoContrast,
    AutoColor,
    Sharpen,
    RemoveBackground,
    Upscale,
}

impl Enhancement {
    /// Effect parameter understood by the image CDN.
    pub fn cdn_effect(self) -> &'static str {
        match self {
            Enhancement::AutoBrightness => "e_auto_brightness",
            Enhancement::AutoContrast => "e_auto_contrast",
            Enhancement::AutoColor => "e_auto_color",
            Enhancement::Sharpen => "e_sharpen",
            Enhancement::RemoveBackground => "e_background_removal",
            Enhancement::Upscale => "e_upscale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementAnalysis {
    /// 0..=100
    pub quality_score: u8,
    pub product_category: String,
    pub issues: Vec<String>,
    pub enhancements: Vec<Enhancement>,
    pub background_suggestion: String,
    pub caption: String,
    pub fallback: bool,
}

impl EnhancementAnalysis {
    /// Comma-joined CDN transformation chain, e.g. `e_auto_brightness,e_sharpen`.
    pub fn transformation(&self) -> String {
        self.enhancements
            .iter()
            .map(|e| e.cdn_effect())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Normalize for EnhancementAnalysis {
    type Context = ();

    fn normalize(payload: Option<&Value>, _: &()) -> Self {
        let f = Fields::new(payload);
        EnhancementAnalysis {
            quality_score: f.integer(
                "qualityScore",
                0..=100,
                DEFAULT_QUALITY_SCORE.into(),
                Coerce::FromString,
            ) as u8,
            product_category: f.text("productCategory", DEFAULT_CATEGORY),
            issues: f.strings("issues", DEFAULT_ISSUES),
            enhancements: f.members("enhancements", DEFAULT_ENHANCEMENTS),
            background_suggestion: f.text("backgroundSuggestion", DEFAULT_BACKGROUND),
            caption: f.text("caption", DEFAULT_CAPTION),
            fallback: false,
        }
    }

    fn fallback(reason: &str, _: &()) -> Self {
        let mut issues = vec![reason.to_string()];
        issues.extend(DEFAULT_ISSUES.iter().map(|s| s.to_string()));
        EnhancementAnalysis {
            issues,
            fallback: true,
            ..EnhancementAnalysis::normalize(None, &())
        }
    }
}

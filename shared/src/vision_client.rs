//! Vision `images:annotate` client: labels, dominant colours, objects and
//! safe-search in a single request.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::error::UpstreamError;
use crate::upstream::{excerpt, ImageFeatures, ImageLabel, VisionAnalyzer};

const MAX_LABELS: usize = 10;
const MAX_COLORS: usize = 5;

pub struct VisionClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl VisionClient {
    pub fn new(client: Client, api_base: &str, api_key: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct AnnotateImageResponse {
    label_annotations: Vec<LabelAnnotation>,
    image_properties_annotation: Option<ImageProperties>,
    localized_object_annotations: Vec<ObjectAnnotation>,
    safe_search_annotation: Option<SafeSearch>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
struct LabelAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageProperties {
    dominant_colors: DominantColors,
}

#[derive(Deserialize)]
struct DominantColors {
    #[serde(default)]
    colors: Vec<ColorInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorInfo {
    color: Rgb,
    #[serde(default)]
    pixel_fraction: f32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Rgb {
    red: f32,
    green: f32,
    blue: f32,
}

#[derive(Deserialize)]
struct ObjectAnnotation {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct SafeSearch {
    #[serde(default)]
    adult: String,
    #[serde(default)]
    violence: String,
}

#[derive(Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

fn hex(c: &Rgb) -> String {
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(c.red), channel(c.green), channel(c.blue))
}

fn likely(level: &str) -> bool {
    matches!(level, "LIKELY" | "VERY_LIKELY")
}

fn features_from(resp: AnnotateImageResponse) -> ImageFeatures {
    let mut colors = resp
        .image_properties_annotation
        .map(|p| p.dominant_colors.colors)
        .unwrap_or_default();
    colors.sort_by(|a, b| b.pixel_fraction.total_cmp(&a.pixel_fraction));

    let mut objects: Vec<String> = Vec::new();
    for o in resp.localized_object_annotations {
        if !o.name.is_empty() && !objects.contains(&o.name) {
            objects.push(o.name);
        }
    }

    ImageFeatures {
        labels: resp
            .label_annotations
            .into_iter()
            .filter(|l| !l.description.is_empty())
            .take(MAX_LABELS)
            .map(|l| ImageLabel {
                description: l.description,
                score: l.score,
            })
            .collect(),
        dominant_colors: colors.iter().take(MAX_COLORS).map(|c| hex(&c.color)).collect(),
        objects,
        safe: resp
            .safe_search_annotation
            .map_or(true, |s| !likely(&s.adult) && !likely(&s.violence)),
    }
}

#[async_trait]
impl VisionAnalyzer for VisionClient {
    async fn analyze(&self, image: &[u8]) -> Result<ImageFeatures, UpstreamError> {
        let request = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [
                    { "type": "LABEL_DETECTION", "maxResults": MAX_LABELS },
                    { "type": "IMAGE_PROPERTIES" },
                    { "type": "OBJECT_LOCALIZATION" },
                    { "type": "SAFE_SEARCH_DETECTION" }
                ]
            }]
        });
        let url = format!("{}/images:annotate", self.api_base);
        debug!(bytes = image.len(), "\u{2192} vision request");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %excerpt(&body), "vision API error");
            return Err(UpstreamError::Http(status.as_u16()));
        }
        let body: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;
        let first = body.responses.into_iter().next().ok_or(UpstreamError::Empty)?;
        if let Some(err) = &first.error {
            return Err(UpstreamError::Parse(err.message.clone()));
        }
        Ok(features_from(first))
    }
}

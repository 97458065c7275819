//! HTTP handlers. Upstream trouble never turns into an error status here:
//! the use cases answer with a fallback envelope instead.

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use futures_util::StreamExt as _;
use serde::Serialize;
use shared::analysis;
use shared::dto::{DescriptionRequest, QuotationRequest, WhatsAppSendRequest};
use shared::messaging::{self, DeliveryOutcome, RetryPolicy};
use shared::schema::{BusinessAnalysis, Normalize};
use shared::upstream::Upstreams;
use tracing::info;

use crate::error::ApiError;

pub struct AppState {
    pub upstreams: Upstreams,
    pub max_upload_bytes: usize,
    pub retry: RetryPolicy,
}

struct UploadedPart {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

#[derive(Serialize)]
struct DeliveryResponse {
    success: bool,
    #[serde(flatten)]
    outcome: DeliveryOutcome,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(format!("invalid JSON body: {err}")).into()),
    )
    .route("/health", web::get().to(health))
    .service(
        web::scope("/api")
            .route("/analyze-business", web::post().to(analyze_business))
            .route("/analyze-business/text", web::post().to(analyze_business_text))
            .route("/enhance-image", web::post().to(enhance_image))
            .route("/quotation", web::post().to(quotation))
            .route("/whatsapp/send", web::post().to(send_whatsapp)),
    );
}

async fn health() -> impl Responder {
    "OK"
}

/// Buffer every multipart field by name, enforcing the upload limit.
async fn read_parts(mut payload: Multipart, limit: usize) -> Result<HashMap<String, UploadedPart>, ApiError> {
    let mut parts = HashMap::new();
    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().to_string();
        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::BadRequest(format!(
                    "{name} exceeds the {limit} byte upload limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        parts.insert(name, UploadedPart { bytes, content_type });
    }
    Ok(parts)
}

fn required(parts: &mut HashMap<String, UploadedPart>, name: &str) -> Result<UploadedPart, ApiError> {
    match parts.remove(name) {
        Some(part) if !part.bytes.is_empty() => Ok(part),
        Some(_) => Err(ApiError::BadRequest(format!("{name} file is empty"))),
        None => Err(ApiError::BadRequest(format!("{name} file is required"))),
    }
}

async fn analyze_business(payload: Multipart, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let mut parts = read_parts(payload, state.max_upload_bytes).await?;
    let audio = required(&mut parts, "audio")?;
    info!(bytes = audio.bytes.len(), "business analysis from audio");
    let report = analysis::analyze_business(&state.upstreams, &audio.bytes).await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn analyze_business_text(
    body: web::Json<DescriptionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let report = analysis::analyze_business_text(&state.upstreams, &body.description).await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn enhance_image(payload: Multipart, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let mut parts = read_parts(payload, state.max_upload_bytes).await?;
    let image = required(&mut parts, "image")?;
    let business = match parts.remove("analysis").filter(|p| !p.bytes.is_empty()) {
        Some(part) => {
            let value: serde_json::Value = serde_json::from_slice(&part.bytes)
                .map_err(|e| ApiError::BadRequest(format!("analysis is not valid JSON: {e}")))?;
            Some(BusinessAnalysis::normalize(Some(&value), &()))
        }
        None => None,
    };
    let mime_type = image.content_type.unwrap_or_else(|| "image/jpeg".to_string());
    info!(bytes = image.bytes.len(), %mime_type, "image enhancement");
    let report = analysis::analyze_image(&state.upstreams, &image.bytes, &mime_type, business.as_ref()).await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn quotation(
    body: web::Json<QuotationRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let envelope = analysis::generate_quotation(&state.upstreams, &body).await?;
    Ok(HttpResponse::Ok().json(envelope))
}

async fn send_whatsapp(
    body: web::Json<WhatsAppSendRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let outcome = messaging::deliver(&state.upstreams.messenger, &body.to, &body.message, state.retry).await?;
    Ok(HttpResponse::Ok().json(DeliveryResponse {
        success: true,
        outcome,
    }))
}

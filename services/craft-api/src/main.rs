//! HTTP surface of the craft-assist backend.

mod error;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use shared::config::Settings;
use shared::messaging::RetryPolicy;
use shared::upstream::Upstreams;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::routes::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new()?;
    let upstreams = Upstreams::from_settings(&settings)?;
    let state = web::Data::new(AppState {
        upstreams,
        max_upload_bytes: settings.max_upload_bytes,
        retry: RetryPolicy::default(),
    });

    info!(port = settings.http_port, provider = %settings.genai_provider, "starting craft-api");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", settings.http_port))?
    .run()
    .await?;
    Ok(())
}

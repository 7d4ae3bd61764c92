//! # NewsMap
//!
//! A web app that maps the places a news article talks about. The user
//! pastes an article URL or its text; an LLM extracts the locations with a
//! confidence score and a short summary of what happened there; confident
//! locations are geocoded and shown as markers on an interactive map next
//! to a results table.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... newsmap --bind 127.0.0.1:8501
//! ```
//!
//! ## Architecture
//!
//! Each submission runs a linear pipeline:
//! 1. **Resolve**: fetch the URL and extract the article body, or take the pasted text
//! 2. **Extract**: ask Gemini for `{name, type, confidence, summary}` records
//! 3. **Filter**: keep records with confidence ≥ 0.90
//! 4. **Geocode**: look each name up on Nominatim, one at a time
//! 5. **Render**: fit a Leaflet map to the markers and list them in a table

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod filter;
mod geocode;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod server;
#[cfg(test)]
mod test_support;
mod utils;

use api::GeminiClient;
use cli::Cli;
use config::Settings;
use geocode::NominatimGeocoder;
use pipeline::Pipeline;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(dotenv = dotenv.is_ok(), "newsmap starting up");

    let args = Cli::parse();

    let mut settings = Settings::load(args.config.as_deref()).await?;
    if let Some(model) = args.model {
        settings.llm.model = model;
    }

    let http = Client::builder()
        .user_agent(settings.fetch.user_agent.clone())
        .build()?;
    let llm = GeminiClient::new(http.clone(), args.gemini_api_key, &settings.llm);
    let geocoder = NominatimGeocoder::new(http.clone(), &settings.geocoder);
    info!(?llm, ?geocoder, "Backends ready");

    let pipeline = Arc::new(Pipeline::new(http, llm, geocoder, settings));
    let app = server::router(pipeline);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

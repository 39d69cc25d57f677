//! HTTP front end serving the badge.

use crate::badge::badge_label;
use crate::core::config::AppConfig;
use crate::core::error::QuoteError;
use crate::core::quote::QuoteProvider;
use crate::label::{self, LabelFont, encode_png};
use crate::providers::eodhd::EodhdProvider;
use crate::store::disk::DiskQuoteCache;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Quotes whose previous close is older than this are still served, with a warning.
const OLD_CLOSE_WARNING_DAYS: i64 = 7;

/// Everything a request needs, shared read-only between requests.
pub struct AppState {
    pub provider: Arc<dyn QuoteProvider>,
    /// `None` when no font could be loaded at startup
    pub font: Option<LabelFont>,
    pub symbol: String,
    pub reference_point: f64,
}

impl AppState {
    /// Wires the disk cache, the EODHD provider and the configured font together.
    pub fn from_config(config: &AppConfig, api_token: Option<String>) -> Self {
        if api_token.is_none() {
            warn!("No API token set, serving sample data");
        }

        let cache = Arc::new(DiskQuoteCache::new(config.cache_dir.clone()));
        let provider = EodhdProvider::new(&config.providers.eodhd.base_url, api_token, cache);

        AppState {
            provider: Arc::new(provider),
            font: LabelFont::load_or_embedded(config.font_path.as_deref()),
            symbol: config.symbol.clone(),
            reference_point: config.reference_point,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error("Malformed data")]
    EmptyResult,

    #[error("no font loaded")]
    NoFont,

    #[error("encoding PNG: {0}")]
    Encode(#[from] image::ImageError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self, "Failed to serve badge");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Looks up the configured symbol and renders its badge as PNG bytes.
pub async fn render_badge(state: &AppState) -> Result<Vec<u8>, AppError> {
    let quotes = state.provider.search(&state.symbol).await?;
    let Some(quote) = quotes.first() else {
        warn!("No data found for {}", state.symbol);
        return Err(AppError::EmptyResult);
    };

    let today = chrono::Utc::now().date_naive();
    if quote.close_is_older_than(chrono::Duration::days(OLD_CLOSE_WARNING_DAYS), today) {
        warn!(
            "Previous close for {} is from {}",
            state.symbol, quote.previous_close_date
        );
    }

    let font = state.font.as_ref().ok_or(AppError::NoFont)?;
    let image = label::render(&badge_label(quote, state.reference_point), font);
    Ok(encode_png(&image)?)
}

pub async fn badge_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let png = render_badge(&state).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

pub fn router(state: Arc<AppState>, route: &str) -> Router {
    Router::new()
        .route(route, get(badge_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves `app` until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on {}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Server closed");
    Ok(())
}

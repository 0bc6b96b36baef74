use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_gateway::app;
use chat_gateway::config::{Args, RateLimitConfig};
use chat_gateway::rate_limit::{RateLimiter, Window};
use chat_gateway::state::AppState;
use chat_gateway::sweeper::idle_sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let upstream = args.upstream();
    if upstream.api_key.is_none() {
        warn!("UPSTREAM_API_KEY is not set, chat requests will fail");
    }

    let limits = RateLimitConfig::from_env(RateLimitConfig::chat());
    let chat_limiter = Arc::new(RateLimiter::new(limits));

    if args.sweep_interval > 0 {
        tokio::spawn(idle_sweeper(
            chat_limiter.clone(),
            Duration::from_secs(args.sweep_interval),
        ));
    }

    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        upstream,
        chat_limiter,
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Gateway running on http://localhost:{}", args.port);
    info!("Forwarding chat requests to {}", args.upstream_url);
    info!(
        per_minute = limits.limit(Window::Minute),
        per_hour = limits.limit(Window::Hour),
        per_day = limits.limit(Window::Day),
        "Chat rate limits"
    );

    axum::serve(listener, app(state)).await?;
    Ok(())
}

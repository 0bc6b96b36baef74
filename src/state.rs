use std::sync::Arc;

use crate::config::UpstreamConfig;
use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub client: reqwest::Client,
    pub upstream: UpstreamConfig,
    pub chat_limiter: Arc<RateLimiter>, // one instance for the chat endpoint
}

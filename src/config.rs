use clap::Parser;
use tracing::warn;

use crate::error::ConfigError;
use crate::rate_limit::Window;

pub const ENV_PER_MINUTE: &str = "CHAT_RATE_LIMIT_PER_MINUTE";
pub const ENV_PER_HOUR: &str = "CHAT_RATE_LIMIT_PER_HOUR";
pub const ENV_PER_DAY: &str = "CHAT_RATE_LIMIT_PER_DAY";

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-gateway")]
#[command(about = "Rate limited streaming proxy for a chat completion API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Chat completion endpoint requests are forwarded to
    #[arg(
        short,
        long,
        env = "UPSTREAM_URL",
        default_value = "https://api.openai.com/v1/chat/completions"
    )]
    pub upstream_url: String,

    // Model used when the client does not pick one
    #[arg(short, long, env = "UPSTREAM_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    // Bearer token for the upstream API
    #[arg(long, env = "UPSTREAM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // Prepended to every conversation as a system message
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    // Seconds between idle client sweeps, 0 disables
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,
}

impl Args {
    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            url: self.upstream_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            system_prompt: self.system_prompt.clone().filter(|p| !p.trim().is_empty()),
        }
    }
}

// Where and how admitted chat requests are forwarded
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
}

/// Caps for the three trailing windows a limiter enforces.
///
/// Each cap is inclusive: a cap of N admits at most N requests inside its
/// window. Caps are checked independently, so nothing stops a minute cap from
/// exceeding the hour cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    requests_per_minute: u32,
    requests_per_hour: u32,
    requests_per_day: u32,
}

impl RateLimitConfig {
    pub fn new(per_minute: u32, per_hour: u32, per_day: u32) -> Result<Self, ConfigError> {
        for (window, value) in [
            (Window::Minute, per_minute),
            (Window::Hour, per_hour),
            (Window::Day, per_day),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { window });
            }
        }

        Ok(Self {
            requests_per_minute: per_minute,
            requests_per_hour: per_hour,
            requests_per_day: per_day,
        })
    }

    /// Stricter quotas used by the chat endpoint: 15/minute, 250/hour, 500/day.
    pub const fn chat() -> Self {
        Self {
            requests_per_minute: 15,
            requests_per_hour: 250,
            requests_per_day: 500,
        }
    }

    pub fn limit(&self, window: Window) -> u32 {
        match window {
            Window::Minute => self.requests_per_minute,
            Window::Hour => self.requests_per_hour,
            Window::Day => self.requests_per_day,
        }
    }

    /// Reads the chat quotas from the process environment, keeping the matching
    /// field of `fallback` for anything unset or unusable.
    pub fn from_env(fallback: Self) -> Self {
        Self::from_lookup(fallback, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(fallback: Self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            requests_per_minute: parse_limit(&lookup, ENV_PER_MINUTE, fallback.requests_per_minute),
            requests_per_hour: parse_limit(&lookup, ENV_PER_HOUR, fallback.requests_per_hour),
            requests_per_day: parse_limit(&lookup, ENV_PER_DAY, fallback.requests_per_day),
        }
    }
}

/// General-purpose quotas: 60/minute, 1000/hour, 5000/day.
impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 1000,
            requests_per_day: 5000,
        }
    }
}

fn parse_limit<F>(lookup: &F, key: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => value,
        _ => {
            warn!(key, value = %raw, default, "ignoring invalid rate limit override");
            default
        }
    }
}

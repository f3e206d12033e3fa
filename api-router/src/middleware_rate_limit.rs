use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tracing::warn;

use crate::{api_state::ApiState, error::ApiError};

const WINDOW: Duration = Duration::from_secs(60 * 60);

struct ClientWindow {
    started: Instant,
    requests: u32,
}

/// Fixed one-hour window of questions per client address.
///
/// Like the ingestion cache, client windows are kept for the process
/// lifetime; an expired window is reset in place on the client's next call.
pub struct AskRateLimiter {
    max_per_window: u32,
    window: Duration,
    clients: DashMap<String, ClientWindow>,
}

impl AskRateLimiter {
    /// `max_per_hour == 0` disables limiting.
    pub fn per_hour(max_per_hour: u32) -> Self {
        Self::with_window(max_per_hour, WINDOW)
    }

    pub fn with_window(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            clients: DashMap::new(),
        }
    }

    /// Count one request for `client`, or return how long until it may retry.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        if self.max_per_window == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut entry = self
            .clients
            .entry(client.to_owned())
            .or_insert_with(|| ClientWindow {
                started: now,
                requests: 0,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.requests = 0;
        }

        if entry.requests >= self.max_per_window {
            let elapsed = now.duration_since(entry.started);
            return Err(self.window.saturating_sub(elapsed));
        }

        entry.requests = entry.requests.saturating_add(1);
        Ok(())
    }
}

pub async fn rate_limit(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_address(&request);

    if let Err(retry_after) = state.rate_limiter.check(&client) {
        warn!(%client, retry_after_secs = retry_after.as_secs(), "ask rate limit exceeded");
        return Err(ApiError::RateLimited(format!(
            "Rate limit exceeded, try again in {} seconds",
            retry_after.as_secs().max(1)
        )));
    }

    Ok(next.run(request).await)
}

fn client_address(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .or_else(|| {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|forwarded| forwarded.split(',').next())
                .map(|first| first.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

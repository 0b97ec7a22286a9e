use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use concierge_core::repository::RateLimiter;

use crate::error::AppError;
use crate::middleware::client::rate_limit_key;
use crate::state::AppState;

/// Fixed-window limit per peer IP; a failing limiter lets traffic through.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.rate_limit.enabled {
        return next.run(req).await;
    }

    let ip = rate_limit_key(req.headers(), req.extensions(), &state.rate_limit.trusted_proxies);

    match state
        .backends
        .rate_limiter
        .check(&ip, state.rate_limit.requests, state.rate_limit.window_seconds)
        .await
    {
        Ok(true) => next.run(req).await,
        Ok(false) => AppError::RateLimited("Rate limit exceeded".to_string()).into_response(),
        Err(e) => {
            warn!("Rate limiter unavailable, letting request through: {}", e);
            next.run(req).await
        }
    }
}

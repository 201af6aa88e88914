//! Authenticated request pipeline.
//!
//! Every consumer call goes through `ApiClient`. It attaches the current
//! bearer token from the shared `TokenStore`, and on a 401 it refreshes the
//! token (single-flight) and re-issues the original request exactly once.
//! A request that is still rejected after its retry is returned to the
//! caller as-is.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{ApiError, ApiRequest, ApiResponse, HttpTransport, TransportError};
use crate::auth::{RefreshCoordinator, TokenStore};

/// Refresh-and-retry cycles allowed per originating request.
const MAX_AUTH_RETRIES: u32 = 1;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// A request travelling through the pipeline together with its retry count.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: ApiRequest,
    pub retry_count: u32,
}

impl RequestContext {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retry_count: 0,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < MAX_AUTH_RETRIES
    }
}

/// Clone is cheap - every field is an `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    store: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<TokenStore>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            store,
            refresher,
        }
    }

    /// Send a request with the current bearer token, recovering once from
    /// an expired token. Non-success statuses are returned, not raised.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut ctx = self.context_for(request);
        self.execute_context(&mut ctx).await
    }

    fn context_for(&self, request: ApiRequest) -> RequestContext {
        RequestContext::new(request.with_bearer(self.store.access_token()))
    }

    /// Run a context through the pipeline. The bearer on the context is sent
    /// as-is; a refresh updates it and counts against `retry_count`, which
    /// carries over if the same context is executed again.
    pub async fn execute_context(&self, ctx: &mut RequestContext) -> Result<ApiResponse, TransportError> {
        loop {
            let response = self.transport.execute(&ctx.request).await?;

            if !response.is_unauthorized() {
                return Ok(response);
            }
            if !ctx.can_retry() {
                debug!(path = %ctx.request.path, retries = ctx.retry_count, "Still unauthorized after retry");
                return Ok(response);
            }

            ctx.retry_count += 1;
            debug!(path = %ctx.request.path, "Unauthorized, refreshing token");

            match self.refresher.refresh().await {
                Ok(token) => ctx.request.bearer = Some(token),
                Err(e) => {
                    warn!(path = %ctx.request.path, error = %e, "Refresh failed, returning original response");
                    return Ok(response);
                }
            }
        }
    }

    /// `execute` plus exponential backoff on 429. Every attempt shares one
    /// context, so the whole call refreshes at most once.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut ctx = self.context_for(request);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.execute_context(&mut ctx).await?;
            if response.status.as_u16() != 429 {
                return Self::check_response(response);
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(path = %ctx.request.path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2;
        }
    }

    fn check_response(response: ApiResponse) -> Result<ApiResponse, ApiError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status, &response.body))
        }
    }

    fn parse<T: DeserializeOwned>(response: &ApiResponse, path: &str) -> Result<T, ApiError> {
        response
            .json()
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(ApiRequest::get(path)).await?;
        Self::parse(&response, path)
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let response = self.send(ApiRequest::post(path).json(body)?).await?;
        Self::parse(&response, path)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }
}

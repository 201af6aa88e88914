//! Outbound HTTP for the Ledgerly API.
//!
//! This module provides the `HttpTransport` seam, its reqwest-backed
//! implementation, and the `ApiClient` request pipeline that attaches the
//! bearer token and recovers once from an expired one.

pub mod client;
pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiClient, RequestContext};
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportError};

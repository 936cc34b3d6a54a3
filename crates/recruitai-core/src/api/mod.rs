//! REST API client module for the RecruitAI service.
//!
//! This module provides the `ApiClient` for communicating with the
//! authentication and profile endpoints.
//!
//! The API uses JWT bearer token authentication. Access tokens are
//! short-lived; the client renews them transparently with the stored
//! refresh token when a request is rejected with 401.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiRequest};
pub use error::ApiError;

//! Core library for the RecruitAI account client.
//!
//! Provides the pieces a front end needs to sign users in and keep them
//! signed in against the RecruitAI API:
//!
//! - `api`: HTTP client with bearer auth and transparent token refresh
//! - `auth`: credential storage, refresh coordination, session state
//! - `models`: request/response payloads
//! - `routes`: navigation targets and the signed-in guard
//! - `config`: persisted settings

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routes;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, Credentials, SessionError, SessionState};
pub use config::Config;
pub use models::{Profile, Role};
pub use routes::Route;

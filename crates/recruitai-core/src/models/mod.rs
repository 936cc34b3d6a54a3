//! Wire models for the RecruitAI authentication API.
//!
//! This module contains the request and response payloads exchanged with
//! the remote API:
//!
//! - `LoginRequest`, `SignupRequest`, `RefreshRequest`: auth request bodies
//! - `AuthResponse`: token pair returned by login, signup and refresh
//! - `Profile`, `Role`: the signed-in user as reported by `/users/me`

pub mod auth;
pub mod user;

pub use auth::{AuthResponse, ErrorBody, LoginRequest, RefreshRequest, SignupRequest};
pub use user::{Profile, Role};

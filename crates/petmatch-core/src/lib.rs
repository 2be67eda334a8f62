//! Core library for PetMatch: API client, session pipeline and models.
//!
//! Every authenticated request goes through `ApiClient::send`, which
//! attaches the stored access token and recovers from an expired token
//! with a single refresh-and-retry. `SessionController` drives login,
//! logout, startup restore and the periodic background refresh.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ValidationErrors};
pub use auth::{Route, SessionController, SessionSnapshot, SessionState, TokenStore};
pub use config::Config;

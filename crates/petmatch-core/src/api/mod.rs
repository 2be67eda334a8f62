//! REST API client module for the PetMatch backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! PetMatch API: authentication, pet profiles, discovery, matches and
//! messages.
//!
//! The API uses JWT bearer authentication. Access tokens are short-lived
//! and renewed through the refresh endpoint without user involvement.

pub mod client;
pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiClient, Registration, TokenPair};
pub use error::{ApiError, ValidationErrors};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

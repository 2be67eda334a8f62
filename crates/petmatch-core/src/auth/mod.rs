//! Authentication module for tokens, navigation and the session lifecycle.
//!
//! This module provides:
//! - `TokenStore`: access/refresh token persistence over a `KeyValueStore`
//!   (memory, JSON file, or the OS keyring via `KeyringStore`)
//! - `Navigator`: where the client is told to go after login or session loss
//! - `SessionController`: login, registration, logout, restore and the
//!   background refresh timer

pub mod credentials;
pub mod navigation;
pub mod session;
pub mod store;

pub use credentials::KeyringStore;
pub use navigation::{navigation_channel, Navigator, Route};
pub use session::{SessionController, SessionSnapshot, SessionState};
pub use store::{
    FileStore, KeyValueStore, MemoryStore, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};

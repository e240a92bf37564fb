//! REST client for the trading-account backend.
//!
//! [`HttpBackend`] implements both [`tradedesk_core::Backend`] (accounts and
//! trades) and [`tradedesk_core::AuthApi`] (login, registration, profile).
//! Authenticated calls carry the session token as a bearer header.
//!
//! Failures are classified into [`tradedesk_core::ApiError`]: connection and
//! decode problems become `Transport`/`Malformed`, non-2xx answers become
//! `Rejected`/`Unauthorized` with the backend's `detail` or `message` text.

pub mod auth;
pub mod backend;
pub mod client;
pub mod routes;

pub use client::{ApiClientConfig, HttpBackend, DEFAULT_BASE_URL};

//! HTTP clients for the remote collaborators.
//!
//! This module provides the `ApiClient` for talking to:
//!
//! - the realtime document store (editorial place content) over its REST
//!   interface, `GET {database}/places.json`
//! - the places service Place Details endpoint (names, ratings, location)
//! - arbitrary image hosts, for the image cache
//!
//! All failures surface as [`ApiError`]; nothing here retries.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

//! # LightFirst
//!
//! Multi-survey light curve retrieval.
//!
//! This crate queries several independent photometric surveys for a sky
//! position and time window and normalizes their heterogeneous responses into
//! one six-column schema: `obj_id, mjd, mag, mag_err, filter, limit`.
//!
//! ## Features
//!
//! - **ATLAS**: forced photometry through the queued job protocol, with
//!   rate-limit aware retries
//! - **ASAS-SN**: Sky Patrol cone search
//! - **ZTF**: AMPEL archive cone search and photopoints
//! - **HTTP API**: synchronous and background queries (`http-server` feature)
//! - **Plots**: magnitude-vs-MJD PNG charts (`plot` feature)
//!
//! ## Architecture
//!
//! - [`models`]: unified light curve schema, query window, MJD handling
//! - [`sources`]: one adapter per survey plus the source registry
//! - [`services`]: the [`Session`](services::Session) that queries all sources
//! - [`config`]: TOML / environment configuration
//! - [`http`]: axum-based HTTP server and request handlers
//!
//! ## Example
//!
//! ```ignore
//! use lightfirst::config::SessionConfig;
//! use lightfirst::services::{write_results_csv, Session};
//! use lightfirst::sources::AuthInfo;
//!
//! let config = SessionConfig::with_sources([("atlas", AuthInfo::credentials("user", "pass"))]);
//! let session = Session::new(&config)?;
//! let results = session
//!     .query_all(244.00092, 22.26803, "2018-06-04", "2018-06-29")
//!     .await?;
//! write_results_csv(&results, std::io::stdout())?;
//! ```

// SourceError carries request context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod models;
pub mod services;
pub mod sources;

#[cfg(feature = "http-server")]
pub mod http;

#[cfg(feature = "plot")]
pub mod plot;

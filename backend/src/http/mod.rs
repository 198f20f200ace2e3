//! HTTP server module for LightFirst.
//!
//! This module provides an axum-based HTTP server that exposes the light
//! curve session as a REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Query parameter parsing and validation                 │
//! │  - Background query jobs and SSE progress logs            │
//! │  - CORS, compression, error handling                      │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services::Session)                        │
//! │  - Sequential per-source queries                          │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Sources (sources::*)                                     │
//! │  - ATLAS / ASAS-SN / ZTF adapters                         │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;

//! Survey data sources.
//!
//! Every survey is wrapped by an adapter implementing [`DataSource`], which
//! maps the survey's native photometry into the unified
//! [`LightCurveTable`](crate::models::LightCurveTable) schema.
//!
//! # Sources
//! - `atlas`: ATLAS forced photometry (queued job protocol, username/password)
//! - `asas-sn`: ASAS-SN Sky Patrol (cone search, no credentials)
//! - `ztf`: ZTF through the AMPEL archive (cone search + photopoints, token)
//!
//! Sources are built through the [`SourceRegistry`], which maps names to
//! constructors.

pub mod asas_sn;
pub mod atlas;
pub mod backoff;
pub mod error;
pub mod registry;
pub mod source;
pub mod ztf;

pub use asas_sn::{AsasSnSource, SkyPatrolClient, SkyPatrolError, SkyPatrolHttpClient};
pub use atlas::{AtlasSource, ATLAS_LIMITING_MAGNITUDE};
pub use backoff::{
    parse_retry_hint, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_BACKOFF,
};
pub use error::{ErrorContext, SourceError, SourceResult};
pub use registry::{SourceConstructor, SourceKind, SourceRegistry};
pub use source::{AuthInfo, DataSource, SourceSettings};
pub use ztf::ZtfSource;

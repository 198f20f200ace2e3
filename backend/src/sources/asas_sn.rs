//! ASAS-SN Sky Patrol light curves.
//!
//! The adapter talks to Sky Patrol through the narrow [`SkyPatrolClient`]
//! contract so the transport can be swapped. Only the first object returned
//! by the cone search is used; several objects at one position are not
//! aggregated.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::{ErrorContext, SourceResult};
use super::source::{string_or_number, DataSource, SourceSettings};
use crate::models::{LightCurveRecord, LightCurveTable, ModifiedJulianDate, QueryWindow};

pub const ASAS_SN_SOURCE_NAME: &str = "asas-sn";

/// Sky Patrol server.
pub const DEFAULT_SKYPATROL_URL: &str = "http://asassn-lb01.ifa.hawaii.edu:9006";

/// Cone search radius.
pub const CONE_RADIUS: qtty::Arcseconds = qtty::Arcseconds::new(7.5);

/// One Sky Patrol photometry row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AsasSnObservation {
    #[serde(deserialize_with = "string_or_number")]
    pub asas_sn_id: String,
    pub jd: f64,
    #[serde(default)]
    pub flux: Option<f64>,
    #[serde(default)]
    pub flux_err: Option<f64>,
    #[serde(default)]
    pub mag: Option<f64>,
    #[serde(default)]
    pub mag_err: Option<f64>,
    pub phot_filter: String,
    #[serde(default)]
    pub limit: Option<f64>,
}

/// Failures of a Sky Patrol lookup.
#[derive(Debug, thiserror::Error)]
pub enum SkyPatrolError {
    /// No catalog object within the search radius.
    #[error("No object found within {radius_arcsec} arcsec of ({ra}, {dec})")]
    NoMatch { ra: f64, dec: f64, radius_arcsec: f64 },

    #[error("Sky Patrol transport error: {0}")]
    Transport(String),

    #[error("Sky Patrol response could not be decoded: {0}")]
    Decode(String),
}

/// Positional lookup against Sky Patrol.
#[async_trait]
pub trait SkyPatrolClient: Send + Sync {
    /// Photometry of every object within `radius` of `(ra, dec)`, in the
    /// order the service reports them.
    async fn cone_search(
        &self,
        ra: f64,
        dec: f64,
        radius: qtty::Arcseconds,
    ) -> Result<Vec<AsasSnObservation>, SkyPatrolError>;
}

#[derive(Debug, Deserialize)]
struct ConeSearchResponse {
    #[serde(default)]
    data: Vec<AsasSnObservation>,
}

/// HTTP implementation of [`SkyPatrolClient`].
///
/// `GET {base}/lightcurves/cone_search?ra&dec&radius&units=arcsec` returning
/// `{"data": [...]}`.
pub struct SkyPatrolHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl SkyPatrolHttpClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SkyPatrolClient for SkyPatrolHttpClient {
    async fn cone_search(
        &self,
        ra: f64,
        dec: f64,
        radius: qtty::Arcseconds,
    ) -> Result<Vec<AsasSnObservation>, SkyPatrolError> {
        let url = format!("{}/lightcurves/cone_search", self.base_url);
        let query = [
            ("ra", ra.to_string()),
            ("dec", dec.to_string()),
            ("radius", radius.value().to_string()),
            ("units", "arcsec".to_string()),
        ];

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(&query)
            .send()
            .await
            .map_err(|e| SkyPatrolError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SkyPatrolError::Transport(format!("status {}", status)));
        }

        let body: ConeSearchResponse = response
            .json()
            .await
            .map_err(|e| SkyPatrolError::Decode(e.to_string()))?;

        if body.data.is_empty() {
            return Err(SkyPatrolError::NoMatch {
                ra,
                dec,
                radius_arcsec: radius.value(),
            });
        }
        Ok(body.data)
    }
}

/// ASAS-SN source.
pub struct AsasSnSource {
    client: Arc<dyn SkyPatrolClient>,
}

impl AsasSnSource {
    /// Create an ASAS-SN source using the HTTP Sky Patrol client.
    ///
    /// No credentials are needed.
    pub fn new(settings: &SourceSettings) -> SourceResult<Self> {
        let http = settings.http_client(ASAS_SN_SOURCE_NAME)?;
        let base_url = settings.base_url(DEFAULT_SKYPATROL_URL);
        Ok(Self::with_client(Arc::new(SkyPatrolHttpClient::new(http, base_url))))
    }

    pub fn with_client(client: Arc<dyn SkyPatrolClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for AsasSnSource {
    fn name(&self) -> &str {
        ASAS_SN_SOURCE_NAME
    }

    async fn get_lc(&self, window: &QueryWindow) -> SourceResult<LightCurveTable> {
        let observations = match self
            .client
            .cone_search(window.ra(), window.dec(), CONE_RADIUS)
            .await
        {
            Ok(observations) => observations,
            Err(e @ SkyPatrolError::NoMatch { .. }) => {
                debug!("{}", e);
                return Ok(LightCurveTable::empty());
            }
            Err(e) => {
                warn!(
                    "ASAS-SN lookup failed, returning empty light curve: {} {}",
                    e,
                    ErrorContext::new(ASAS_SN_SOURCE_NAME).with_operation("cone_search")
                );
                return Ok(LightCurveTable::empty());
            }
        };

        let table = observations_to_table(&observations).restrict_to(window);
        info!("ASAS-SN returned {} observations", table.len());
        Ok(table)
    }
}

/// Rows of the first object in `observations`, in the unified schema.
///
/// Rows without a magnitude or magnitude error are non-detections and are
/// skipped. A missing limit becomes NaN.
pub fn observations_to_table(observations: &[AsasSnObservation]) -> LightCurveTable {
    let Some(first) = observations.first() else {
        return LightCurveTable::empty();
    };
    let object_id = first.asas_sn_id.as_str();

    observations
        .iter()
        .filter(|o| o.asas_sn_id == object_id)
        .filter_map(|o| {
            let mag = o.mag?;
            let mag_err = o.mag_err?;
            Some(LightCurveRecord {
                obj_id: o.asas_sn_id.clone(),
                mjd: ModifiedJulianDate::from_julian_date(o.jd).value(),
                mag,
                mag_err,
                filter: o.phot_filter.clone(),
                limit: o.limit.unwrap_or(f64::NAN),
            })
        })
        .collect()
}

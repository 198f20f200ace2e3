//! ZTF photometry through the AMPEL archive API.
//!
//! A query is a cone search returning candidate object ids, followed by one
//! photopoint request per object. Times are sent as Julian Dates.

use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::{ErrorContext, SourceError, SourceResult};
use super::source::{string_or_number, DataSource, SourceSettings};
use crate::models::{LightCurveRecord, LightCurveTable, ModifiedJulianDate, QueryWindow};

pub const ZTF_SOURCE_NAME: &str = "ztf";

/// AMPEL ZTF archive endpoint.
pub const DEFAULT_AMPEL_URL: &str = "https://ampel.zeuthen.desy.de/api/ztf/archive/v3";

/// Cone search radius: one arcsecond, expressed in degrees as the API expects.
pub fn cone_radius_deg() -> f64 {
    qtty::Arcseconds::new(1.0).to::<qtty::Degree>().value()
}

/// Band letter for a ZTF filter id.
pub fn band_for_fid(fid: i64) -> Option<&'static str> {
    match fid {
        1 => Some("g"),
        2 => Some("r"),
        3 => Some("i"),
        _ => None,
    }
}

/// Filter label for a row. Unknown ids are kept visible as `fid:<n>`.
fn filter_label(fid: i64) -> String {
    match band_for_fid(fid) {
        Some(band) => band.to_string(),
        None => format!("fid:{}", fid),
    }
}

#[derive(Debug, Deserialize)]
struct ObjectId(#[serde(deserialize_with = "string_or_number")] String);

/// One entry of `prv_candidates`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoPoint {
    pub jd: f64,
    #[serde(default)]
    pub magpsf: Option<f64>,
    #[serde(default)]
    pub sigmapsf: Option<f64>,
    pub fid: i64,
    #[serde(default)]
    pub diffmaglim: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PhotoPoints {
    #[serde(default)]
    prv_candidates: Vec<PhotoPoint>,
}

/// ZTF/AMPEL source.
pub struct ZtfSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ZtfSource {
    /// Create a ZTF source. Requires a bearer `token`.
    pub fn new(settings: &SourceSettings) -> SourceResult<Self> {
        let token = settings.auth.require_token(ZTF_SOURCE_NAME)?;
        Ok(Self {
            client: settings.http_client(ZTF_SOURCE_NAME)?,
            base_url: settings.base_url(DEFAULT_AMPEL_URL),
            token,
        })
    }

    fn context(operation: &str) -> ErrorContext {
        ErrorContext::new(ZTF_SOURCE_NAME).with_operation(operation)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, f64)],
        operation: &str,
    ) -> SourceResult<T> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, format!("bearer {}", self.token))
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::request(e.to_string(), Self::context(operation)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::request(
                "unexpected status",
                Self::context(operation).with_status(status.as_u16()),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::parse(e.to_string(), Self::context(operation)))
    }

    /// Object ids within the cone that have detections between the JD bounds.
    async fn cone(&self, window: &QueryWindow) -> SourceResult<Vec<String>> {
        let (jd_start, jd_end) = window.jd_range();
        let url = format!("{}/objects/cone_search", self.base_url);
        let query = [
            ("ra", window.ra()),
            ("dec", window.dec()),
            ("radius", cone_radius_deg()),
            ("jd_start", jd_start),
            ("jd_end", jd_end),
        ];

        let ids: Vec<ObjectId> = self.get_json(&url, &query, "cone_search").await?;
        Ok(ids.into_iter().map(|id| id.0).collect())
    }

    /// Photometry of one object, mapped to the unified schema.
    async fn photo(&self, object_id: &str, window: &QueryWindow) -> SourceResult<LightCurveTable> {
        let (jd_start, jd_end) = window.jd_range();
        let url = format!("{}/object/{}/photopoints", self.base_url, object_id);
        let query = [("jd_start", jd_start), ("jd_end", jd_end)];

        let points: PhotoPoints = self.get_json(&url, &query, "photopoints").await?;
        Ok(photopoints_to_table(object_id, &points.prv_candidates))
    }
}

#[async_trait]
impl DataSource for ZtfSource {
    fn name(&self) -> &str {
        ZTF_SOURCE_NAME
    }

    async fn get_lc(&self, window: &QueryWindow) -> SourceResult<LightCurveTable> {
        let objects = match self.cone(window).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("ZTF cone search failed, returning empty light curve: {}", e);
                return Ok(LightCurveTable::empty());
            }
        };

        let mut table = LightCurveTable::empty();
        for object_id in &objects {
            debug!("Querying ZTF object {}", object_id);
            match self.photo(object_id, window).await {
                Ok(rows) => table.append(rows),
                Err(e) => warn!("Skipping ZTF object {}: {}", object_id, e),
            }
        }

        let table = table.restrict_to(window);
        info!(
            "ZTF returned {} observations across {} objects",
            table.len(),
            objects.len()
        );
        Ok(table)
    }
}

/// Map AMPEL photopoints to unified rows tagged with `object_id`.
///
/// Points without `magpsf` or `sigmapsf` are upper limits, not detections,
/// and are skipped. A missing `diffmaglim` becomes NaN.
pub fn photopoints_to_table(object_id: &str, points: &[PhotoPoint]) -> LightCurveTable {
    let mut table = LightCurveTable::empty();
    for point in points {
        let (Some(mag), Some(mag_err)) = (point.magpsf, point.sigmapsf) else {
            continue;
        };

        if band_for_fid(point.fid).is_none() {
            warn!("ZTF object {} has unmapped filter id {}", object_id, point.fid);
        }

        table.push(LightCurveRecord {
            obj_id: object_id.to_string(),
            mjd: ModifiedJulianDate::from_julian_date(point.jd).value(),
            mag,
            mag_err,
            filter: filter_label(point.fid),
            limit: point.diffmaglim.unwrap_or(f64::NAN),
        });
    }
    table
}

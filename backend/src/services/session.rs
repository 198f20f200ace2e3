//! Multi-source light curve session.
//!
//! A [`Session`] holds one adapter per configured source name and queries them
//! one after another. Results are keyed by source name; a source that found
//! nothing contributes an empty table rather than a missing key.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use tracing::{info, warn};

use super::error::{SessionError, SessionResult};
use crate::config::SessionConfig;
use crate::models::{LightCurveTable, ModifiedJulianDate, QueryWindow, COLUMNS};
use crate::sources::{
    AuthInfo, DataSource, Sleeper, SourceError, SourceKind, SourceRegistry, TokioSleeper,
};

/// Light curves keyed by source name.
pub type QueryResults = BTreeMap<String, LightCurveTable>;

/// Write every table of `results` as one CSV with a leading `source` column.
pub fn write_results_csv<W: io::Write>(results: &QueryResults, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(std::iter::once("source").chain(COLUMNS))?;
    for (source, table) in results {
        for record in table.iter() {
            wtr.serialize((source, record))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Parse the human-readable query bounds and build a validated window.
pub fn build_window(ra: f64, dec: f64, date_min: &str, date_max: &str) -> SessionResult<QueryWindow> {
    let mjd_min = ModifiedJulianDate::parse_date(date_min).map_err(SessionError::InvalidDate)?;
    let mjd_max = ModifiedJulianDate::parse_date(date_max).map_err(SessionError::InvalidDate)?;
    QueryWindow::new(ra, dec, mjd_min, mjd_max).map_err(SessionError::InvalidQuery)
}

/// Configured set of data sources.
pub struct Session {
    sources: Vec<(String, Arc<dyn DataSource>)>,
}

impl Session {
    /// Build a session from configuration with the built-in registry.
    ///
    /// # Errors
    /// Configuration error if a source name is unknown or its credentials
    /// are incomplete. No network call is made.
    pub fn new(config: &SessionConfig) -> SessionResult<Self> {
        SessionBuilder::new(config.clone()).build()
    }

    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    /// Session over already constructed sources, keyed by their own names.
    pub fn from_sources(sources: Vec<Arc<dyn DataSource>>) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|s| (s.name().to_string(), s))
                .collect(),
        }
    }

    /// Configured source names, in query order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Query every source for light curves at `(ra, dec)` between two dates.
    ///
    /// # Arguments
    /// * `ra` - Right ascension in decimal degrees
    /// * `dec` - Declination in decimal degrees
    /// * `date_min` - Earliest observation date (e.g. `"2018-06-04"`)
    /// * `date_max` - Latest observation date
    ///
    /// # Returns
    /// One table per configured source. Sources that found nothing map to an
    /// empty table.
    ///
    /// # Errors
    /// * `InvalidDate` / `InvalidQuery` for malformed input
    /// * `Source` when a source fails unrecoverably (e.g. ATLAS job lost)
    pub async fn query_all(
        &self,
        ra: f64,
        dec: f64,
        date_min: &str,
        date_max: &str,
    ) -> SessionResult<QueryResults> {
        let window = build_window(ra, dec, date_min, date_max)?;
        self.query_window(&window).await
    }

    /// Query every source over a prepared window.
    pub async fn query_window(&self, window: &QueryWindow) -> SessionResult<QueryResults> {
        info!(
            "Querying {} sources at ra={}, dec={} for MJD {}..{}",
            self.sources.len(),
            window.ra(),
            window.dec(),
            window.mjd_min().value(),
            window.mjd_max().value()
        );

        let mut results = QueryResults::new();
        for (name, source) in &self.sources {
            let table = Self::run_source(name, source.as_ref(), window).await?;
            results.insert(name.clone(), table);
        }

        Ok(results)
    }

    /// Query the single configured source registered as `name`.
    ///
    /// # Errors
    /// Configuration error if `name` is not part of this session.
    pub async fn query_source(&self, name: &str, window: &QueryWindow) -> SessionResult<LightCurveTable> {
        let (name, source) = self
            .sources
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| {
                SessionError::configuration_for(name, format!("Source '{}' is not configured", name))
            })?;
        Self::run_source(name, source.as_ref(), window).await
    }

    async fn run_source(
        name: &str,
        source: &dyn DataSource,
        window: &QueryWindow,
    ) -> SessionResult<LightCurveTable> {
        let table = source.get_lc(window).await.map_err(|e| {
            warn!("Source {} failed: {}", name, e);
            SessionError::source_failure(name, e)
        })?;
        info!("{}: {} observations", name, table.len());
        Ok(table)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("sources", &self.source_names())
            .finish()
    }
}

/// Builder for configuring session creation.
///
/// # Example
/// ```ignore
/// use lightfirst::config::SessionConfig;
/// use lightfirst::services::Session;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SessionConfig::from_default_location()?;
///     let session = Session::builder(config).build()?;
///     let results = session
///         .query_all(244.00092, 22.26803, "2018-06-04", "2018-06-29")
///         .await?;
///     Ok(())
/// }
/// ```
pub struct SessionBuilder {
    config: SessionConfig,
    registry: SourceRegistry,
    sleeper: Arc<dyn Sleeper>,
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            registry: SourceRegistry::builtin(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Resolve source names against `registry` instead of the built-in one.
    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sleeper handed to every source for its retry loops.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Resolve every configured name, then construct the sources.
    pub fn build(self) -> SessionResult<Session> {
        let mut resolved: Vec<(String, &String, &AuthInfo)> =
            Vec::with_capacity(self.config.sources.len());
        let mut unknown: Vec<&str> = Vec::new();
        for (configured, auth) in &self.config.sources {
            let name = canonical_source_name(configured);
            if !self.registry.contains(&name) {
                unknown.push(configured.as_str());
            } else if resolved.iter().any(|(seen, _, _)| *seen == name) {
                return Err(SessionError::configuration_for(
                    configured.clone(),
                    format!("Source '{}' configured more than once", name),
                ));
            } else {
                resolved.push((name, configured, auth));
            }
        }
        if let Some(first) = unknown.first() {
            return Err(SessionError::configuration_for(
                *first,
                format!(
                    "Unknown data source(s): {}; known sources: {}",
                    unknown.join(", "),
                    self.registry.names().join(", ")
                ),
            ));
        }

        let mut sources = Vec::with_capacity(resolved.len());
        for (name, configured, auth) in resolved {
            let settings = self.config.settings_for(&name, auth, Arc::clone(&self.sleeper));
            let source = self.registry.create(&name, &settings).map_err(|e| match e {
                SourceError::ConfigurationError { message, .. } => {
                    SessionError::configuration_for(configured.clone(), format!("{}: {}", name, message))
                }
                other => SessionError::source_failure(name.clone(), other),
            })?;
            sources.push((name, source));
        }
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let names: Vec<&str> = sources.iter().map(|(name, _)| name.as_str()).collect();
        info!("Session configured with sources: {:?}", names);
        Ok(Session { sources })
    }
}

/// Registry name for a configured source, accepting the built-in spellings
/// such as `asas_sn` or `ASASSN`. Other names pass through unchanged.
fn canonical_source_name(name: &str) -> String {
    match name.parse::<SourceKind>() {
        Ok(kind) => kind.as_str().to_string(),
        Err(_) => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_window_parses_dates() {
        let window = build_window(244.00092, 22.26803, "2018-06-04", "2018-06-29").unwrap();
        assert_eq!(window.mjd_min().value(), 58273.0);
        assert_eq!(window.mjd_max().value(), 58298.0);
    }

    #[test]
    fn test_build_window_errors() {
        assert!(matches!(
            build_window(10.0, 10.0, "yesterday", "2018-06-29"),
            Err(SessionError::InvalidDate(_))
        ));
        assert!(matches!(
            build_window(10.0, 10.0, "2018-06-29", "2018-06-04"),
            Err(SessionError::InvalidQuery(_))
        ));
        assert!(matches!(
            build_window(400.0, 10.0, "2018-06-04", "2018-06-29"),
            Err(SessionError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_unknown_source_rejected() {
        let config = SessionConfig::with_sources([
            ("atlas", AuthInfo::credentials("u", "p")),
            ("gaia", AuthInfo::none()),
        ]);
        let err = Session::new(&config).unwrap_err();
        match err {
            SessionError::Configuration {
                message,
                source_name,
            } => {
                assert_eq!(source_name.as_deref(), Some("gaia"));
                assert!(message.contains("gaia"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = SessionConfig::with_sources([("ztf", AuthInfo::none())]);
        assert!(matches!(
            Session::new(&config),
            Err(SessionError::Configuration { .. })
        ));
    }

    #[test]
    fn test_builtin_sources_constructed() {
        let config = SessionConfig::with_sources([
            ("asas-sn", AuthInfo::none()),
            ("atlas", AuthInfo::credentials("u", "p")),
            ("ztf", AuthInfo::token("t")),
        ]);
        let session = Session::new(&config).unwrap();
        assert_eq!(session.source_names(), vec!["asas-sn", "atlas", "ztf"]);
    }

    #[test]
    fn test_alternate_spellings_resolve_to_builtin_names() {
        let config = SessionConfig::with_sources([
            ("asas_sn", AuthInfo::none()),
            ("ZTF", AuthInfo::token("t")),
        ]);
        let session = Session::new(&config).unwrap();
        assert_eq!(session.source_names(), vec!["asas-sn", "ztf"]);
    }

    #[test]
    fn test_same_source_twice_rejected() {
        let config = SessionConfig::with_sources([
            ("asas-sn", AuthInfo::none()),
            ("asassn", AuthInfo::none()),
        ]);
        assert!(matches!(
            Session::new(&config),
            Err(SessionError::Configuration { .. })
        ));
    }

    #[test]
    fn test_results_csv_prepends_source() {
        let mut results = QueryResults::new();
        results.insert(
            "ztf".to_string(),
            LightCurveTable::from_records(vec![crate::models::LightCurveRecord {
                obj_id: "ZTF18a".into(),
                mjd: 58280.5,
                mag: 18.1,
                mag_err: 0.05,
                filter: "g".into(),
                limit: 20.5,
            }]),
        );
        results.insert("asas-sn".to_string(), LightCurveTable::empty());

        let mut out = Vec::new();
        write_results_csv(&results, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "source,obj_id,mjd,mag,mag_err,filter,limit",
                "ztf,ZTF18a,58280.5,18.1,0.05,g,20.5",
            ]
        );
    }

    #[test]
    fn test_results_csv_header_only_when_empty() {
        let mut out = Vec::new();
        write_results_csv(&QueryResults::new(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap().trim(),
            "source,obj_id,mjd,mag,mag_err,filter,limit"
        );
    }
}

//! Source registry for resolving configured source names.
//!
//! Each known source name maps to a constructor. Names are resolved when a
//! session is built, so a misspelled source fails before any network call.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::asas_sn::{AsasSnSource, ASAS_SN_SOURCE_NAME};
use super::atlas::{AtlasSource, ATLAS_SOURCE_NAME};
use super::error::{ErrorContext, SourceError, SourceResult};
use super::source::{DataSource, SourceSettings};
use super::ztf::{ZtfSource, ZTF_SOURCE_NAME};

/// Built-in survey sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Atlas,
    AsasSn,
    Ztf,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Atlas, SourceKind::AsasSn, SourceKind::Ztf];

    /// Registry name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atlas => ATLAS_SOURCE_NAME,
            Self::AsasSn => ASAS_SN_SOURCE_NAME,
            Self::Ztf => ZTF_SOURCE_NAME,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    /// Parse a source name ("atlas", "asas-sn", "ztf").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "atlas" => Ok(Self::Atlas),
            "asas-sn" | "asassn" | "asas_sn" => Ok(Self::AsasSn),
            "ztf" => Ok(Self::Ztf),
            _ => Err(format!("Unknown data source: {}", s)),
        }
    }
}

/// Constructor stored in the registry.
pub type SourceConstructor =
    Arc<dyn Fn(&SourceSettings) -> SourceResult<Arc<dyn DataSource>> + Send + Sync>;

/// Explicit mapping from source name to constructor.
///
/// # Example
/// ```ignore
/// use lightfirst::sources::{AuthInfo, SourceRegistry, SourceSettings};
///
/// let registry = SourceRegistry::builtin();
/// let settings = SourceSettings::new(AuthInfo::token("my-ampel-token"));
/// let ztf = registry.create("ztf", &settings)?;
/// ```
#[derive(Clone)]
pub struct SourceRegistry {
    constructors: BTreeMap<String, SourceConstructor>,
}

impl SourceRegistry {
    /// A registry with no sources.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry with ATLAS, ASAS-SN and ZTF.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(ATLAS_SOURCE_NAME, |settings| {
            Ok(Arc::new(AtlasSource::new(settings)?) as Arc<dyn DataSource>)
        });
        registry.register(ASAS_SN_SOURCE_NAME, |settings| {
            Ok(Arc::new(AsasSnSource::new(settings)?) as Arc<dyn DataSource>)
        });
        registry.register(ZTF_SOURCE_NAME, |settings| {
            Ok(Arc::new(ZtfSource::new(settings)?) as Arc<dyn DataSource>)
        });
        registry
    }

    /// Add or replace the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&SourceSettings) -> SourceResult<Arc<dyn DataSource>> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Look up the constructor for `name`.
    pub fn resolve(&self, name: &str) -> Option<SourceConstructor> {
        self.constructors.get(name).cloned()
    }

    /// Build the source registered under `name`.
    ///
    /// # Errors
    /// Configuration error for unknown names or invalid settings.
    pub fn create(&self, name: &str, settings: &SourceSettings) -> SourceResult<Arc<dyn DataSource>> {
        let constructor = self.resolve(name).ok_or_else(|| {
            SourceError::configuration(
                format!(
                    "Unknown data source '{}'; known sources: {}",
                    name,
                    self.names().join(", ")
                ),
                ErrorContext::new(name).with_operation("resolve_source"),
            )
        })?;
        constructor(settings)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

//! Query window: the sky position and MJD range a light curve is requested for.

use serde::{Deserialize, Serialize};

use super::time::ModifiedJulianDate;

/// Sky position and time range of a light curve query.
///
/// Right ascension and declination are in decimal degrees. The window is
/// inclusive on both ends. Construct through [`QueryWindow::new`] so the
/// invariants below always hold:
///
/// - `0 <= ra < 360`
/// - `-90 <= dec <= 90`
/// - `mjd_min <= mjd_max`, all values finite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryWindow {
    ra: f64,
    dec: f64,
    mjd_min: ModifiedJulianDate,
    mjd_max: ModifiedJulianDate,
}

impl QueryWindow {
    /// Build a validated window.
    ///
    /// # Errors
    /// Returns a human-readable message describing the first violated bound.
    pub fn new(
        ra: f64,
        dec: f64,
        mjd_min: impl Into<ModifiedJulianDate>,
        mjd_max: impl Into<ModifiedJulianDate>,
    ) -> Result<Self, String> {
        let mjd_min = mjd_min.into();
        let mjd_max = mjd_max.into();

        if !ra.is_finite() || !(0.0..360.0).contains(&ra) {
            return Err(format!("ra must be in [0, 360) degrees, got {}", ra));
        }
        if !dec.is_finite() || !(-90.0..=90.0).contains(&dec) {
            return Err(format!("dec must be in [-90, 90] degrees, got {}", dec));
        }
        if !mjd_min.value().is_finite() || !mjd_max.value().is_finite() {
            return Err("mjd bounds must be finite".to_string());
        }
        if mjd_min > mjd_max {
            return Err(format!(
                "mjd_min ({}) must not exceed mjd_max ({})",
                mjd_min.value(),
                mjd_max.value()
            ));
        }

        Ok(Self {
            ra,
            dec,
            mjd_min,
            mjd_max,
        })
    }

    /// Right ascension in decimal degrees.
    pub fn ra(&self) -> f64 {
        self.ra
    }

    /// Declination in decimal degrees.
    pub fn dec(&self) -> f64 {
        self.dec
    }

    pub fn mjd_min(&self) -> ModifiedJulianDate {
        self.mjd_min
    }

    pub fn mjd_max(&self) -> ModifiedJulianDate {
        self.mjd_max
    }

    /// Julian Date bounds `(jd_start, jd_end)` of the window.
    pub fn jd_range(&self) -> (f64, f64) {
        (self.mjd_min.to_julian_date(), self.mjd_max.to_julian_date())
    }

    /// Whether `mjd` falls inside the inclusive window.
    pub fn contains_mjd(&self, mjd: f64) -> bool {
        self.mjd_min.value() <= mjd && mjd <= self.mjd_max.value()
    }
}

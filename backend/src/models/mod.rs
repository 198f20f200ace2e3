pub mod lightcurve;
pub mod query;
pub mod time;

pub use lightcurve::*;
pub use query::*;
pub use time::*;

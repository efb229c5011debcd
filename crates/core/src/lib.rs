pub mod config;
pub mod errors;
pub mod logging;
pub mod mjd;

pub use config::*;
pub use errors::*;
pub use logging::init_logging;
pub use mjd::{datetime_from_mjd, format_mjd_iso, mjd_from_datetime, mjd_now, mjd_preview};

pub mod models;
pub mod validation;
pub mod value_objects;

pub use fpqueue_core::{QueueError, QueueResult};
pub use models::*;
pub use validation::{validate_mjd_window, validate_radeclist};
pub use value_objects::*;

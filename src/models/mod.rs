pub mod enums;
pub mod extraction;
pub mod record;

pub use enums::*;
pub use extraction::*;
pub use record::*;

use thiserror::Error;

/// Errors raised while converting persisted/string data into typed models.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },
}

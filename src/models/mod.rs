pub mod document;
pub mod enums;
pub mod field;
pub mod feedback;
pub mod rule;

pub use document::*;
pub use enums::*;
pub use field::*;
pub use feedback::*;
pub use rule::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}

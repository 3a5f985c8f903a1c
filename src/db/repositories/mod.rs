//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod college;
pub mod faq;
pub mod form;
pub mod program;
pub mod university;

pub use college::{CollegeRepository, SqlxCollegeRepository};
pub use faq::{FaqRepository, SqlxFaqRepository};
pub use form::{FormRepository, SqlxFormRepository};
pub use program::{ProgramRepository, SqlxProgramRepository};
pub use university::{SqlxUniversityRepository, UniversityRepository};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Decode a JSON text column
pub(crate) fn from_json_column<T: DeserializeOwned>(raw: &str, column: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON in column {}", column))
}

/// Encode a value for a JSON text column
pub(crate) fn to_json_column<T: Serialize>(value: &T, column: &str) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("Failed to encode column {}", column))
}

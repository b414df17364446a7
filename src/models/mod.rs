//! Data models for the paper library.
//!
//! Field names follow the backend's snake_case JSON payloads exactly.

mod note;
mod paper;
mod search;
mod tag;

pub use note::*;
pub use paper::*;
pub use search::*;
pub use tag::*;

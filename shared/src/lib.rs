//! Shared types for Coverfetch: the variant/payload data model, the error
//! taxonomy, and payload content sniffing.
pub mod errors;
pub mod models;
pub mod sniff;

pub use errors::{CoverError, CoverResult, FetchError, MetadataError, TargetError, WriteError};
pub use models::{FetchResult, ImageSize, Locators, Payload, Report};

//! Common building blocks for the Azure Stack HCI provider: annotation
//! accessors, errors, retry and kube client helpers

#![deny(missing_docs)]

pub mod annotations;
pub mod error;
pub mod kube_utils;
pub mod retry;
pub mod telemetry;

pub use annotations::{
    Annotated, AnnotationContent, AnnotationError, AnnotationExt, AnnotationMap,
};
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager recorded on writes made by provider controllers
pub const FIELD_MANAGER: &str = "hci-controller";

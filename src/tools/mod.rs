//! Tools: the static catalog of named operations this proxy exposes.
//!
//! This module handles:
//! - Declarative input schemas and their JSON Schema rendering
//! - Argument validation, coercion and default-filling
//! - The immutable name → definition registry
//! - The shipped deployment catalogs (`seo-forge`, `unified`, `client`)

pub mod catalog;
pub mod errors;
pub mod registry;
pub mod schema;
pub mod validator;

// Re-exports for convenience
pub use catalog::{Catalog, CATALOG_VERSION};
pub use errors::{RegistryError, ValidationError};
pub use registry::{HttpMethod, RequestBody, ToolDefinition, ToolRegistry};
pub use schema::{FieldKind, FieldSpec, Schema};
pub use validator::{validate, ValidatedArguments};

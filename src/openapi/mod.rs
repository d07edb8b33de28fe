//! API descriptions: parsing and the per-backend catalog.

mod catalog;
mod document;

pub use catalog::{SpecCatalog, SPEC_PATH};
pub use document::{
    derived_operation_id, parse_document, ApiDocument, EndpointDescriptor, ParameterLocation,
    ParameterSpec, RequestBodySpec,
};

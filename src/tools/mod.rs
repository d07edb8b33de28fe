//! Tools: synthesis from endpoints, the swappable catalog, argument
//! translation and execution.

pub mod catalog;
pub mod executor;
pub mod result;
pub mod synthesis;
pub mod translator;

pub use catalog::{SchemaType, ToolCatalog, ToolCatalogSnapshot, ToolDescriptor, ToolListing};
pub use executor::{ExecutorHealth, ToolExecutor};
pub use result::{ContentItem, ToolResult};
pub use translator::{error_result, from_http, to_http, HttpRequestPlan};

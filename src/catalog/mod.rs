//! Product Catalog
//!
//! Static product templates and the paint color palette, loaded from TOML.

mod registry;
mod template;

pub use registry::CatalogRegistry;
pub use template::{ArtAnchor, PaintColor, ProductTemplate};

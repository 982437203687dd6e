//! Catalog Domain Concerns

pub mod assets;
pub mod products;

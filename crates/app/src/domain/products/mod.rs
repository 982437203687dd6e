//! Products

pub mod data;
pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::{ProductsRepositoryError, ProductsServiceError};
pub use repository::{PgProductsRepository, ProductsRepository};
pub use service::*;

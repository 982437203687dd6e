//! Products errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::assets::AssetStoreError;

#[derive(Debug, Error)]
pub enum ProductsRepositoryError {
    #[error("product already exists")]
    AlreadyExists,

    #[error("product not found")]
    NotFound,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for ProductsRepositoryError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::ForeignKeyViolation) => Self::NotFound,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProductsServiceError {
    #[error("product code already exists")]
    AlreadyExists,

    #[error("product not found")]
    NotFound,

    #[error("missing required field: {0}")]
    MissingRequiredData(&'static str),

    #[error("invalid value for field: {0}")]
    InvalidData(&'static str),

    #[error("asset upload failed")]
    AssetStore(#[from] AssetStoreError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<ProductsRepositoryError> for ProductsServiceError {
    fn from(error: ProductsRepositoryError) -> Self {
        match error {
            ProductsRepositoryError::AlreadyExists => Self::AlreadyExists,
            ProductsRepositoryError::NotFound => Self::NotFound,
            ProductsRepositoryError::MissingRequiredData => Self::MissingRequiredData("product"),
            ProductsRepositoryError::InvalidData => Self::InvalidData("product"),
            ProductsRepositoryError::Sql(error) => Self::Sql(error),
        }
    }
}

//! Products

pub(crate) mod assets;
mod errors;
mod form;
mod handlers;
mod responses;

pub(crate) use handlers::*;

//! Core data models and traits

mod error;
mod request;
mod response;
mod token_store;

pub use error::*;
pub use request::*;
pub use response::*;
pub use token_store::*;

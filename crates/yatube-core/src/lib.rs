//! # Yatube Core
//!
//! The domain layer of the Yatube blogging platform.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, pagination and the ports adapters implement.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;

pub use error::RepoError;
pub use pagination::{Page, PageWindow};

//! `quill-core`: shared identity primitives.
//!
//! This crate contains **pure** building blocks (no storage or transport concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::UserId;

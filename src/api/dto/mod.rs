//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names follow the dashboard's camelCase convention.

pub mod auth_dto;
pub mod companion_dto;

pub use auth_dto::*;
pub use companion_dto::*;

//! HTTP handlers for hairfit-api.

pub mod catalog;
pub mod health;
pub mod transform;

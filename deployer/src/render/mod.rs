//! Payload flattening and template rendering

pub mod context;
pub mod templates;

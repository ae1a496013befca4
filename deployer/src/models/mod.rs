//! Data models

pub mod payload;

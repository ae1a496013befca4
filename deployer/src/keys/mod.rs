//! Credential handling

pub mod credentials;

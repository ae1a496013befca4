//! Stackable Deployer Library
//!
//! Renders Terraform workspaces from a deployment payload and drives the
//! provisioning tool through init, destroy, plan and apply.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod keys;
pub mod logs;
pub mod models;
pub mod render;
pub mod storage;
pub mod utils;

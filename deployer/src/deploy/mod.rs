//! Deployment module

pub mod command;
pub mod driver;
pub mod fsm;
pub mod service;
pub mod workspace;

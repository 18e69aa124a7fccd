//! batchgate: a batch upload gateway in front of a remote image-processing engine.

pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;

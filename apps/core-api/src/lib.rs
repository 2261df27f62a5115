//! Core API host: configuration, logging, HTTP server and module wiring.

pub mod config;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod signals;

pub use config::{AppConfig, HostConfig};
pub use server::{App, serve};

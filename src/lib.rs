pub mod api;
pub mod channel;
pub mod cli;
pub mod command;
pub mod config;
mod handler;
pub mod models;
pub mod reconcile;

pub use config::ServerConfig;
pub use handler::{serve, ServeError, Server};

//! HTTP API for uploading repositories and asking questions about them.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::GatewayServer;

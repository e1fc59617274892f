//! API server and routes

pub mod middleware;
pub mod routes;
mod server;
pub mod types;
pub mod ws;

pub use server::ApiServer;

//! `certbadge` HTTP server.
//!
//! Wires together the core pipeline, storage backend, and HTTP routes into a
//! running Axum server. Serves images at `/badges/{id}`, the admin JSON API
//! at `/v1/certificates` and health at `/v1/sys/health`.

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod worker;

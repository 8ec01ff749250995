//! # teller-server
//!
//! Axum REST front end for the teller bank.
//!
//! - [`RestServer`]: lifecycle-guarded listener serving [`routes::router`]
//! - Routes under `/api` for accounts, payment orders and statements, plus
//!   `/health`
//! - [`ApiError`]: maps bank failures to HTTP status codes
//! - [`spawn_coordinator`]: background task settling received payment orders
//!   on an interval until its `CancellationToken` fires

#![deny(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod health;
pub mod routes;
pub mod server;

pub use config::ServerConfig;
pub use coordinator::spawn_coordinator;
pub use errors::{ApiError, Result, ServerError};
pub use routes::{AppState, router};
pub use server::RestServer;

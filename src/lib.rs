// Mirim Auth - authenticated API client for the Mirim OAuth service

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod http_client;
pub mod models;
pub mod services;
pub mod store;

pub use context::AuthContext;
pub use error::{ApiError, RefreshError};

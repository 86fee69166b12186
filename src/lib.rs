pub mod auth;
pub mod config;
pub mod db;
pub mod diff;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod ws;

use std::sync::Arc;

use db::store::DocStore;
use services::rate_limit::RateLimiter;
use ws::registry::RoomRegistry;

/// Shared application state handed to every handler and the socket loop.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocStore>,
    pub registry: Arc<RoomRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
}

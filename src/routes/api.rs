use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{
    doc_changes, doc_create, doc_delete, doc_get, doc_list, doc_search, doc_update,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::ws::wsdocs::ws_handler;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/documents", post(doc_create).get(doc_list))
        .route(
            "/documents/:doc_id",
            get(doc_get).put(doc_update).delete(doc_delete),
        )
        .route("/documents/:doc_id/changes", post(doc_changes))
        .route("/search", get(doc_search))
        .route_layer(middleware::from_fn(auth_middleware)) // Applies to all routes added above
        .with_state(state)
}

/// Create the realtime channel route
pub fn create_ws_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state)
}

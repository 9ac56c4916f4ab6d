//! REST endpoint handlers organized by resource.

pub mod auth;
pub mod companions;
pub mod system;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::api_info))
        .merge(auth::routes())
        .merge(companions::routes())
}

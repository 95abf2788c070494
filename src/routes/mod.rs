use axum::Router;

use crate::AppState;

mod auth;
mod health;
mod pages;
mod predict;
mod predict_soil;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .merge(predict::router())
        .merge(predict_soil::router())
        .merge(health::router())
        .with_state(state)
}

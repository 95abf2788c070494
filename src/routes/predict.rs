//! The tabular crop recommendation endpoint.
//!
//! `POST /predict` is a thin handler: the authenticated user, the raw form,
//! and the shared state go into the pipeline; the pipeline owns validation,
//! encoding, inference, and persistence.

use axum::extract::State;
use axum::{routing::post, Form, Router};

use crate::{pipeline, AppResult, AppState, CurrentUser, RawPredictionForm};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/predict", post(handler))
}

async fn handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<RawPredictionForm>,
) -> AppResult<String> {
    // ---
    let crop = pipeline::recommend(&state, &user, &form).await?;
    Ok(format!("{crop} is the suitable crop"))
}

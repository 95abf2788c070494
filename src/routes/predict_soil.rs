//! The soil photo classification endpoint.
//!
//! `GET /predict_soil` serves the upload form; `POST /predict_soil` reads the
//! multipart `file` field, preprocesses the image, runs the classifier, and
//! answers with the label and its confidence as JSON.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Html;
use axum::{routing::get, Json, Router};

use crate::error::AppError;
use crate::inference::image_to_input;
use crate::{AppResult, AppState, CurrentUser, SoilPrediction};

use super::pages::page;

// ---

/// Soil photos come straight off phone cameras; allow up to 10 MiB.
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/predict_soil", get(upload_form).post(handler))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
}

async fn upload_form(CurrentUser(_user): CurrentUser) -> Html<String> {
    // ---
    page(
        "Soil classification",
        "<h1>Classify a soil photo</h1>\n\
         <form method=\"post\" action=\"/predict_soil\" enctype=\"multipart/form-data\">\n\
           <label>Photo <input type=\"file\" name=\"file\"></label>\n\
           <button type=\"submit\">Classify</button>\n\
         </form>\n\
         <p><a href=\"/dashboard\">Back to dashboard</a></p>",
    )
}

async fn handler(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<SoilPrediction>> {
    // ---
    let mut image_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Decode(format!("multipart read failed: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Decode(format!("upload read failed: {e}")))?;
            if !bytes.is_empty() {
                image_data = Some(bytes.to_vec());
            }
        }
    }

    let image_data =
        image_data.ok_or_else(|| AppError::Decode("no file field in upload".to_string()))?;

    let input = image_to_input(&image_data)?;
    let (category, confidence) = state.soil_model.classify(input)?;

    tracing::info!(
        "soil classified as {} (confidence {:.3})",
        category.image_label(),
        confidence
    );

    Ok(Json(SoilPrediction {
        class: category.image_label(),
        soil_confidence: confidence,
    }))
}

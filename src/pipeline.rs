//! The crop recommendation pipeline behind `POST /predict`.
//!
//! One parameterized validate → encode → predict → resolve → persist
//! sequence. Ordering is the contract: nothing touches the model before
//! validation passes, and nothing touches the database before the model's
//! answer resolves to a known crop.

use crate::db;
use crate::error::{AppError, AppResult, INVALID_FORM_MSG};
use crate::inference::FEATURE_COUNT;
use crate::models::{crop_name, PredictionRequest, RawPredictionForm, SoilCategory, User};
use crate::AppState;

// ---

fn reject() -> AppError {
    AppError::Validation(INVALID_FORM_MSG.to_string())
}

/// Parse a non-negative integer field; missing, non-numeric, and negative
/// values all reject.
fn parse_int(field: &Option<String>) -> AppResult<i32> {
    // ---
    let value: i32 = field
        .as_deref()
        .ok_or_else(reject)?
        .trim()
        .parse()
        .map_err(|_| reject())?;
    if value < 0 {
        return Err(reject());
    }
    Ok(value)
}

/// Parse a floating-point field; missing and non-numeric values reject.
fn parse_float(field: &Option<String>) -> AppResult<f64> {
    // ---
    field
        .as_deref()
        .ok_or_else(reject)?
        .trim()
        .parse()
        .map_err(|_| reject())
}

/// Parse and range-check the raw form.
///
/// Accepted only if `0 < ph <= 14`, `0 < temperature < 60`, `humidity > 0`,
/// and the soil string names a known category. Rejection carries the
/// user-visible message and guarantees no model call and no persistence.
pub fn validate(form: &RawPredictionForm) -> AppResult<PredictionRequest> {
    // ---
    let nitrogen = parse_int(&form.nitrogen)?;
    let phosphorus = parse_int(&form.phosphorus)?;
    let potassium = parse_int(&form.potassium)?;
    let temperature = parse_float(&form.temperature)?;
    let humidity = parse_float(&form.humidity)?;
    let ph = parse_float(&form.ph)?;
    let rainfall = parse_float(&form.rainfall)?;
    let soil = form
        .soil
        .as_deref()
        .and_then(SoilCategory::parse)
        .ok_or_else(reject)?;

    let in_range = 0.0 < ph && ph <= 14.0 && 0.0 < temperature && temperature < 60.0 && humidity > 0.0;
    if !in_range {
        return Err(reject());
    }

    Ok(PredictionRequest {
        nitrogen,
        phosphorus,
        potassium,
        temperature,
        humidity,
        ph,
        rainfall,
        soil,
    })
}

/// Assemble the model's feature vector.
///
/// The order is the training-time order
/// `{N, P, K, temperature, humidity, ph, rainfall, soil_code}` and must not
/// change: the model is order-sensitive and has no feature naming.
pub fn encode_features(request: &PredictionRequest) -> [f64; FEATURE_COUNT] {
    // ---
    [
        f64::from(request.nitrogen),
        f64::from(request.phosphorus),
        f64::from(request.potassium),
        request.temperature,
        request.humidity,
        request.ph,
        request.rainfall,
        f64::from(request.soil.code()),
    ]
}

/// Full pipeline: validate, encode, predict, resolve the crop name, persist.
///
/// A prediction record is written if and only if validation passed and the
/// model's id resolved to a known crop; failures at any stage leave the
/// database untouched.
pub async fn recommend(
    state: &AppState,
    user: &User,
    form: &RawPredictionForm,
) -> AppResult<&'static str> {
    // ---
    let request = validate(form)?;
    let features = encode_features(&request);

    let class_id = state.crop_model.predict(&features);
    let crop = crop_name(class_id).ok_or_else(|| {
        AppError::Inference(format!("predicted class id {} is not a known crop", class_id))
    })?;

    db::insert_prediction(&state.pool, user, &request, crop).await?;
    tracing::info!("prediction stored: user={} crop={}", user.name, crop);

    Ok(crop)
}

//! Database access for users and prediction records.
//!
//! One focused function per query, all taking the shared [`PgPool`]. Errors
//! are returned as raw `sqlx::Error` so callers decide how to surface them
//! (the routing layer maps them through `AppError::Database`).

use sqlx::PgPool;

use crate::models::{PredictionRequest, PredictionRow, User};

// ---

/// Insert a newly registered user.
///
/// A duplicate name surfaces as a unique-constraint database error; the
/// registration route turns that into a user-visible message.
pub async fn insert_user(pool: &PgPool, name: &str, mobile_number: &str) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO users (name, mobile_number) VALUES ($1, $2)
        "#,
    )
    .bind(name)
    .bind(mobile_number)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up a user by name.
pub async fn find_user(pool: &PgPool, name: &str) -> Result<Option<User>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, User>(
        r#"
        SELECT name, mobile_number FROM users WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Append one successful prediction to the log.
///
/// Only called after validation passed and the model id resolved to a crop
/// name; there is no other writer of this table.
pub async fn insert_prediction(
    pool: &PgPool,
    user: &User,
    request: &PredictionRequest,
    predicted_crop: &str,
) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO prediction (
            name, mobile_number, n, p, k,
            temperature, humidity, ph, rainfall, soil, predicted_crop
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(&user.name)
    .bind(&user.mobile_number)
    .bind(request.nitrogen)
    .bind(request.phosphorus)
    .bind(request.potassium)
    .bind(request.temperature)
    .bind(request.humidity)
    .bind(request.ph)
    .bind(request.rainfall)
    .bind(request.soil.as_str())
    .bind(predicted_crop)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a user's most recent prediction records for the dashboard.
pub async fn recent_predictions(
    pool: &PgPool,
    name: &str,
    limit: i64,
) -> Result<Vec<PredictionRow>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, PredictionRow>(
        r#"
        SELECT n, p, k, temperature, humidity, ph, rainfall,
               soil, predicted_crop, created_at
        FROM prediction
        WHERE name = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(name)
    .bind(limit)
    .fetch_all(pool)
    .await
}

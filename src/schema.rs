//! Database schema management for `agroflow`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `users` table backing registration/login and the `prediction`
/// table logging successful crop recommendations. Safe to call on every
/// startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Registered users; `name` doubles as the login identifier
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            name          TEXT        PRIMARY KEY,
            mobile_number TEXT        NOT NULL,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Append-only log of successful crop recommendations
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prediction (
            id             SERIAL      PRIMARY KEY,
            name           TEXT        NOT NULL REFERENCES users (name),
            mobile_number  TEXT        NOT NULL,
            n              INTEGER     NOT NULL,
            p              INTEGER     NOT NULL,
            k              INTEGER     NOT NULL,
            temperature    DOUBLE PRECISION NOT NULL,
            humidity       DOUBLE PRECISION NOT NULL,
            ph             DOUBLE PRECISION NOT NULL,
            rainfall       DOUBLE PRECISION NOT NULL,
            soil           TEXT        NOT NULL,
            predicted_crop TEXT        NOT NULL,
            created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Dashboard queries fetch a user's recent predictions
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_prediction_name
            ON prediction (name);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

//! Registration, login, and logout.
//!
//! Login succeeds only when the stored mobile number for the given name
//! matches the submitted one; a failed attempt gets one neutral message that
//! never reveals whether the name exists or the number was wrong. A
//! successful login sets the session cookie and redirects to the dashboard.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{routing::get, Form, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::session::{credentials_match, SESSION_COOKIE};
use crate::{db, AppError, AppResult, AppState};

use super::pages::page;

// ---

const INCORRECT_CREDENTIALS_MSG: &str = "Incorrect credentials.";

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout).post(logout))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    name: String,
    mobile_number: String,
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    name: String,
    mobile_number: String,
}

// ---

fn login_page(error: Option<&str>) -> Html<String> {
    // ---
    let notice = error
        .map(|msg| format!("<p>{msg}</p>\n"))
        .unwrap_or_default();
    page(
        "Login",
        &format!(
            "<h1>Log in</h1>\n{notice}\
             <form method=\"post\" action=\"/login\">\n\
               <label>Name <input name=\"name\"></label>\n\
               <label>Mobile number <input name=\"mobile_number\"></label>\n\
               <button type=\"submit\">Login</button>\n\
             </form>\n\
             <p>No account? <a href=\"/register\">Register</a>.</p>"
        ),
    )
}

fn register_page(error: Option<&str>) -> Html<String> {
    // ---
    let notice = error
        .map(|msg| format!("<p>{msg}</p>\n"))
        .unwrap_or_default();
    page(
        "Register",
        &format!(
            "<h1>Register</h1>\n{notice}\
             <form method=\"post\" action=\"/register\">\n\
               <label>Name <input name=\"name\"></label>\n\
               <label>Mobile number <input name=\"mobile_number\"></label>\n\
               <button type=\"submit\">Register</button>\n\
             </form>\n\
             <p>Already registered? <a href=\"/login\">Log in</a>.</p>"
        ),
    )
}

async fn login_form() -> Html<String> {
    // ---
    login_page(None)
}

async fn register_form() -> Html<String> {
    // ---
    register_page(None)
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    // ---
    let user = db::find_user(&state.pool, &form.name).await?;

    // One combined check so the response never says which field was wrong.
    let matched = user
        .as_ref()
        .map(|u| credentials_match(&u.mobile_number, &form.mobile_number))
        .unwrap_or(false);

    match (matched, user) {
        (true, Some(user)) => {
            let token = state
                .sessions
                .issue(&user)
                .map_err(|e| AppError::Internal(format!("session issue failed: {e}")))?;

            let cookie = Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();

            tracing::info!("login successful for {}", user.name);
            Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response())
        }
        _ => {
            tracing::info!("failed login attempt for {}", form.name);
            Ok((
                StatusCode::UNAUTHORIZED,
                login_page(Some(INCORRECT_CREDENTIALS_MSG)),
            )
                .into_response())
        }
    }
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    // ---
    let name = form.name.trim();
    if let Err(msg) = check_registration(name, &form.mobile_number) {
        return Ok((StatusCode::BAD_REQUEST, register_page(Some(msg))).into_response());
    }

    match db::insert_user(&state.pool, name, &form.mobile_number).await {
        Ok(()) => {
            tracing::info!("registered user {}", name);
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) if is_unique_violation(&e) => Ok((
            StatusCode::CONFLICT,
            register_page(Some("That name is already registered.")),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    // ---
    let removal = Cookie::build(SESSION_COOKIE).path("/").build();
    (jar.remove(removal), Redirect::to("/login"))
}

/// Registration constraints: name 2–20 characters, mobile number at least
/// 10 digits and nothing but digits.
fn check_registration(name: &str, mobile_number: &str) -> Result<(), &'static str> {
    // ---
    let len = name.chars().count();
    if !(2..=20).contains(&len) {
        return Err("Name must be between 2 and 20 characters.");
    }
    if mobile_number.len() < 10 || !mobile_number.chars().all(|c| c.is_ascii_digit()) {
        return Err("Mobile number must be at least 10 digits.");
    }
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    // ---
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn registration_name_bounds() {
        // ---
        assert!(check_registration("al", "9999999999").is_ok());
        assert!(check_registration("a", "9999999999").is_err());
        assert!(check_registration(&"x".repeat(20), "9999999999").is_ok());
        assert!(check_registration(&"x".repeat(21), "9999999999").is_err());
    }

    #[test]
    fn registration_mobile_number_rules() {
        // ---
        assert!(check_registration("alice", "9999999999").is_ok());
        assert!(check_registration("alice", "123456789").is_err()); // too short
        assert!(check_registration("alice", "12345abcde").is_err()); // non-digits
        assert!(check_registration("alice", "123456789012345").is_ok());
    }
}

//! Landing page and the authenticated dashboard.
//!
//! Pages are small server-rendered HTML fragments; there is no client-side
//! app. The shared `page`/`escape_html` helpers also serve the auth forms.

use axum::extract::State;
use axum::response::Html;
use axum::{routing::get, Router};

use crate::models::SoilCategory;
use crate::{db, AppResult, AppState, CurrentUser, PredictionRow};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/", get(home))
        .route("/dashboard", get(dashboard).post(dashboard))
}

/// Wrap a body fragment in the shared document shell.
pub(super) fn page(title: &str, body: &str) -> Html<String> {
    // ---
    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title} \
         &ndash; AgroFlow</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

/// Minimal HTML escaping for user-supplied text interpolated into pages.
pub(super) fn escape_html(raw: &str) -> String {
    // ---
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

async fn home() -> Html<String> {
    // ---
    page(
        "Home",
        "<h1>AgroFlow</h1>\n\
         <p>Crop recommendations and soil classification for your field.</p>\n\
         <p><a href=\"/login\">Log in</a> or <a href=\"/register\">register</a> to get started.</p>",
    )
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    // ---
    let recent = db::recent_predictions(&state.pool, &user.name, 10).await?;

    let soil_options: String = SoilCategory::ALL
        .iter()
        .map(|c| format!("<option value=\"{0}\">{0}</option>", c.as_str()))
        .collect();

    let body = format!(
        "<h1>Welcome, {name}</h1>\n\
         <h2>Crop recommendation</h2>\n\
         <form method=\"post\" action=\"/predict\">\n\
           <label>Nitrogen <input name=\"Nitrogen\"></label>\n\
           <label>Phosphorus <input name=\"Phosphorus\"></label>\n\
           <label>Potassium <input name=\"Potassium\"></label>\n\
           <label>Temperature <input name=\"Temperature\"></label>\n\
           <label>Humidity <input name=\"Humidity\"></label>\n\
           <label>pH <input name=\"pH\"></label>\n\
           <label>Rainfall <input name=\"Rainfall\"></label>\n\
           <label>Soil <select name=\"Soil\">{soil_options}</select></label>\n\
           <button type=\"submit\">Predict</button>\n\
         </form>\n\
         <p><a href=\"/predict_soil\">Classify a soil photo</a> &middot; \
         <a href=\"/logout\">Log out</a></p>\n\
         {history}",
        name = escape_html(&user.name),
        soil_options = soil_options,
        history = history_fragment(&recent),
    );

    Ok(page("Dashboard", &body))
}

fn history_fragment(recent: &[PredictionRow]) -> String {
    // ---
    if recent.is_empty() {
        return "<h2>Recent predictions</h2>\n<p>No predictions yet.</p>".to_string();
    }

    let rows: String = recent
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                r.created_at.format("%Y-%m-%d %H:%M"),
                r.n,
                r.p,
                r.k,
                r.temperature,
                r.humidity,
                r.ph,
                r.rainfall,
                r.soil,
                r.predicted_crop,
            )
        })
        .collect();

    format!(
        "<h2>Recent predictions</h2>\n\
         <table>\n\
         <tr><th>When</th><th>N</th><th>P</th><th>K</th><th>Temp</th>\
         <th>Humidity</th><th>pH</th><th>Rainfall</th><th>Soil</th><th>Crop</th></tr>\n\
         {rows}\n\
         </table>"
    )
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn escape_html_neutralizes_markup() {
        // ---
        assert_eq!(
            escape_html("<script>alert(\"hi\") & more</script>"),
            "&lt;script&gt;alert(&quot;hi&quot;) &amp; more&lt;/script&gt;"
        );
        assert_eq!(escape_html("alice"), "alice");
    }

    #[test]
    fn empty_history_renders_placeholder() {
        // ---
        assert!(history_fragment(&[]).contains("No predictions yet"));
    }
}

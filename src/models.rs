//! Domain types for the crop advisory service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Soil categories known to both classifiers.
///
/// The ordinal code is the tabular model's `soil` feature; the underscore
/// label is the class name the image model was trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilCategory {
    Alluvial,
    Black,
    Clay,
    Red,
}

impl SoilCategory {
    // ---
    /// All categories in ordinal-code order.
    pub const ALL: [SoilCategory; 4] = [
        SoilCategory::Alluvial,
        SoilCategory::Black,
        SoilCategory::Clay,
        SoilCategory::Red,
    ];

    /// Ordinal code fed to the tabular model. Must stay in sync with the
    /// encoding used when the model was trained.
    pub fn code(self) -> u8 {
        // ---
        match self {
            SoilCategory::Alluvial => 0,
            SoilCategory::Black => 1,
            SoilCategory::Clay => 2,
            SoilCategory::Red => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<SoilCategory> {
        // ---
        Self::ALL.get(code as usize).copied()
    }

    /// Form-facing name, e.g. `"Black"`.
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            SoilCategory::Alluvial => "Alluvial",
            SoilCategory::Black => "Black",
            SoilCategory::Clay => "Clay",
            SoilCategory::Red => "Red",
        }
    }

    /// Image-model class label, e.g. `"Black_Soil"`.
    pub fn image_label(self) -> &'static str {
        // ---
        match self {
            SoilCategory::Alluvial => "Alluvial_Soil",
            SoilCategory::Black => "Black_Soil",
            SoilCategory::Clay => "Clay_Soil",
            SoilCategory::Red => "Red_Soil",
        }
    }

    /// Parse the form-facing name. Unknown strings are a validation failure
    /// at the caller.
    pub fn parse(s: &str) -> Option<SoilCategory> {
        // ---
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

// ---

/// Crop names in training order; the tabular model's class ids are 1-based
/// indexes into this table.
const CROP_NAMES: [&str; 22] = [
    "rice",
    "maize",
    "jute",
    "cotton",
    "coconut",
    "papaya",
    "orange",
    "apple",
    "muskmelon",
    "watermelon",
    "grapes",
    "mango",
    "banana",
    "pomegranate",
    "lentil",
    "blackgram",
    "mungbean",
    "mothbeans",
    "pigeonpeas",
    "kidneybeans",
    "chickpea",
    "coffee",
];

/// Resolve a tabular-model class id (1–22) to its crop name.
///
/// Ids outside that range mean the model artifact and this table disagree;
/// the caller must treat that as an inference failure, never substitute a
/// default crop.
pub fn crop_name(id: i64) -> Option<&'static str> {
    // ---
    if (1..=CROP_NAMES.len() as i64).contains(&id) {
        Some(CROP_NAMES[(id - 1) as usize])
    } else {
        None
    }
}

// ---

/// Registered user; `name` is the primary key.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    // ---
    pub name: String,
    pub mobile_number: String,
}

/// Raw `/predict` form fields exactly as submitted.
///
/// Everything is optional text here; parsing and range checks live in the
/// pipeline validator so a missing or malformed field produces our own
/// message instead of a framework rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RawPredictionForm {
    // ---
    #[serde(rename = "Nitrogen")]
    pub nitrogen: Option<String>,
    #[serde(rename = "Phosphorus")]
    pub phosphorus: Option<String>,
    #[serde(rename = "Potassium")]
    pub potassium: Option<String>,
    #[serde(rename = "Temperature")]
    pub temperature: Option<String>,
    #[serde(rename = "Humidity")]
    pub humidity: Option<String>,
    #[serde(rename = "pH")]
    pub ph: Option<String>,
    #[serde(rename = "Rainfall")]
    pub rainfall: Option<String>,
    #[serde(rename = "Soil")]
    pub soil: Option<String>,
}

/// A `/predict` submission that has passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    // ---
    pub nitrogen: i32,
    pub phosphorus: i32,
    pub potassium: i32,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
    pub soil: SoilCategory,
}

/// Persisted prediction record as read back for the dashboard listing.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PredictionRow {
    // ---
    pub n: i32,
    pub p: i32,
    pub k: i32,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
    pub soil: String,
    pub predicted_crop: String,
    pub created_at: DateTime<Utc>,
}

/// JSON body returned by `POST /predict_soil`.
#[derive(Debug, Serialize)]
pub struct SoilPrediction {
    // ---
    pub class: &'static str,
    pub soil_confidence: f32,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn soil_codes_round_trip() {
        // ---
        for category in SoilCategory::ALL {
            assert_eq!(SoilCategory::from_code(category.code()), Some(category));
        }

        // Codes are exactly 0..=3
        assert_eq!(SoilCategory::Alluvial.code(), 0);
        assert_eq!(SoilCategory::Black.code(), 1);
        assert_eq!(SoilCategory::Clay.code(), 2);
        assert_eq!(SoilCategory::Red.code(), 3);
        assert_eq!(SoilCategory::from_code(4), None);
    }

    #[test]
    fn soil_parse_accepts_known_names_only() {
        // ---
        for category in SoilCategory::ALL {
            assert_eq!(SoilCategory::parse(category.as_str()), Some(category));
        }

        assert_eq!(SoilCategory::parse("Sandy"), None);
        assert_eq!(SoilCategory::parse("black"), None); // case-sensitive, as trained
        assert_eq!(SoilCategory::parse(""), None);
    }

    #[test]
    fn image_labels_match_training_classes() {
        // ---
        let labels: Vec<_> = SoilCategory::ALL.iter().map(|c| c.image_label()).collect();
        assert_eq!(
            labels,
            vec!["Alluvial_Soil", "Black_Soil", "Clay_Soil", "Red_Soil"]
        );
    }

    #[test]
    fn crop_lookup_is_total_over_known_ids() {
        // ---
        for id in 1..=22 {
            assert!(crop_name(id).is_some(), "id {} should resolve", id);
        }

        assert_eq!(crop_name(1), Some("rice"));
        assert_eq!(crop_name(22), Some("coffee"));
    }

    #[test]
    fn crop_lookup_fails_outside_known_ids() {
        // ---
        assert_eq!(crop_name(0), None);
        assert_eq!(crop_name(23), None);
        assert_eq!(crop_name(-1), None);
        assert_eq!(crop_name(i64::MAX), None);
    }
}

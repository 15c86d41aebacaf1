//! Parsing of hosted inference responses
//!
//! The endpoint's schema is not pinned down, so the body is read as loose
//! JSON and only the first top prediction is extracted.

use diagnosis_core::Prediction;
use serde_json::Value;

const LABEL_KEYS: [&str; 2] = ["label", "className"];
const SCORE_KEYS: [&str; 3] = ["score", "probability", "confidence"];

/// Extract the first prediction from a response body
///
/// Accepts `[{..}, ..]` and the batched form `[[{..}, ..]]`. Returns `None`
/// for anything else, including error objects and empty arrays.
pub fn top_prediction(body: &Value) -> Option<Prediction> {
    let first = match body.as_array()?.first()? {
        Value::Array(inner) => inner.first()?,
        other => other,
    };
    let entry = first.as_object()?;

    let label = LABEL_KEYS
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))?;
    let score = SCORE_KEYS
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_f64))?;

    Some(Prediction::new(label, score as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_score_list() {
        let body = json!([
            {"label": "Tomato___Late_blight", "score": 0.97},
            {"label": "Tomato___healthy", "score": 0.02}
        ]);
        assert_eq!(
            top_prediction(&body),
            Some(Prediction::new("Tomato___Late_blight", 0.97))
        );
    }

    #[test]
    fn test_class_name_probability_fields() {
        let body = json!([{"className": "Leaf Rust", "probability": 0.92}]);
        assert_eq!(
            top_prediction(&body),
            Some(Prediction::new("Leaf Rust", 0.92))
        );
    }

    #[test]
    fn test_batched_response() {
        let body = json!([[{"label": "Mosaic Virus", "score": 0.81}]]);
        assert_eq!(
            top_prediction(&body),
            Some(Prediction::new("Mosaic Virus", 0.81))
        );
    }

    #[test]
    fn test_score_not_range_checked() {
        let body = json!([{"label": "odd", "score": 3.5}]);
        assert_eq!(top_prediction(&body).map(|p| p.score), Some(3.5));
    }

    #[test]
    fn test_rejects_unusable_bodies() {
        for body in [
            json!([]),
            json!([[]]),
            json!({"error": "Model is currently loading", "estimated_time": 20.0}),
            json!(["just a string"]),
            json!([{"label": "no score"}]),
            json!([{"score": 0.5}]),
            json!([{"label": "text score", "score": "0.5"}]),
            json!(null),
        ] {
            assert_eq!(top_prediction(&body), None, "body: {}", body);
        }
    }
}

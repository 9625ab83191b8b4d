//! Response validation.
//!
//! The webhook is a no-code automation flow, so the body is checked field by field
//! instead of being deserialized straight into [`AnalysisResponse`]; that way each
//! failure maps onto a precise [`SubmitError`] kind.

use crate::error::SubmitError;
use crate::model::AnalysisResponse;
use serde_json::{Map, Value};

pub fn validate(body: &str) -> Result<AnalysisResponse, SubmitError> {
    if body.trim().is_empty() {
        return Err(SubmitError::EmptyBody);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| SubmitError::MalformedJson(e.to_string()))?;

    let obj = match value {
        Value::Object(obj) => obj,
        // Respond-to-webhook nodes wrap single items in an array.
        Value::Array(mut items) if items.len() == 1 => match items.remove(0) {
            Value::Object(obj) => obj,
            _ => return Err(SubmitError::WrongType("<root>")),
        },
        _ => return Err(SubmitError::WrongType("<root>")),
    };

    let result = required_str(&obj, "result")?;
    let probability = required_probability(&obj)?;
    let original_image = required_str(&obj, "original_image")?;
    let mask = optional_str(&obj, "mask")?;
    let overlay_image = optional_str(&obj, "overlay_image")?;

    Ok(AnalysisResponse {
        result,
        probability,
        original_image,
        mask,
        overlay_image,
    })
}

fn required_str(obj: &Map<String, Value>, name: &'static str) -> Result<String, SubmitError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(SubmitError::MissingField(name)),
        Some(Value::String(s)) if s.is_empty() => Err(SubmitError::MissingField(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(SubmitError::WrongType(name)),
    }
}

fn required_probability(obj: &Map<String, Value>) -> Result<f64, SubmitError> {
    const NAME: &str = "probability";
    let p = match obj.get(NAME) {
        None | Some(Value::Null) => return Err(SubmitError::MissingField(NAME)),
        Some(Value::Number(n)) => n.as_f64().ok_or(SubmitError::WrongType(NAME))?,
        Some(_) => return Err(SubmitError::WrongType(NAME)),
    };
    if !(0.0..=1.0).contains(&p) {
        return Err(SubmitError::OutOfRange(NAME));
    }
    Ok(p)
}

fn optional_str(
    obj: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<String>, SubmitError> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SubmitError::WrongType(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full() -> Value {
        json!({
            "result": "Tumor detectado",
            "probability": 0.8734,
            "original_image": "data:image/png;base64,AAAA",
            "mask": "data:image/png;base64,BBBB",
            "overlay_image": "https://example.com/overlay.png"
        })
    }

    #[test]
    fn accepts_complete_response() {
        let r = validate(&full().to_string()).unwrap();
        assert_eq!(r.result, "Tumor detectado");
        assert_eq!(r.probability, 0.8734);
        assert_eq!(r.mask.as_deref(), Some("data:image/png;base64,BBBB"));
        assert_eq!(
            r.overlay_image.as_deref(),
            Some("https://example.com/overlay.png")
        );
    }

    #[test]
    fn blank_body_is_empty() {
        assert_eq!(validate(""), Err(SubmitError::EmptyBody));
        assert_eq!(validate("  \n\t"), Err(SubmitError::EmptyBody));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            validate("<html>502</html>"),
            Err(SubmitError::MalformedJson(_))
        ));
        assert!(matches!(
            validate("{\"result\": "),
            Err(SubmitError::MalformedJson(_))
        ));
    }

    #[test]
    fn each_required_field_is_checked() {
        for field in ["result", "probability", "original_image"] {
            let mut v = full();
            v.as_object_mut().unwrap().remove(field);
            assert_eq!(
                validate(&v.to_string()),
                Err(SubmitError::MissingField(field)),
                "removing {field}"
            );
        }
    }

    #[test]
    fn null_or_empty_required_field_counts_as_missing() {
        let mut v = full();
        v["result"] = json!("");
        assert_eq!(
            validate(&v.to_string()),
            Err(SubmitError::MissingField("result"))
        );
        let mut v = full();
        v["probability"] = Value::Null;
        assert_eq!(
            validate(&v.to_string()),
            Err(SubmitError::MissingField("probability"))
        );
    }

    #[test]
    fn wrong_primitive_types_are_rejected() {
        let mut v = full();
        v["probability"] = json!("0.87");
        assert_eq!(
            validate(&v.to_string()),
            Err(SubmitError::WrongType("probability"))
        );
        let mut v = full();
        v["result"] = json!(true);
        assert_eq!(
            validate(&v.to_string()),
            Err(SubmitError::WrongType("result"))
        );
        let mut v = full();
        v["mask"] = json!(42);
        assert_eq!(validate(&v.to_string()), Err(SubmitError::WrongType("mask")));
    }

    #[test]
    fn probability_outside_unit_interval_is_rejected() {
        let mut v = full();
        v["probability"] = json!(87.34);
        assert_eq!(
            validate(&v.to_string()),
            Err(SubmitError::OutOfRange("probability"))
        );
        v["probability"] = json!(-0.1);
        assert_eq!(
            validate(&v.to_string()),
            Err(SubmitError::OutOfRange("probability"))
        );
    }

    #[test]
    fn integer_probability_is_accepted() {
        let mut v = full();
        v["probability"] = json!(1);
        assert_eq!(validate(&v.to_string()).unwrap().probability, 1.0);
    }

    #[test]
    fn empty_or_null_optional_images_mean_absent() {
        let mut v = full();
        v["mask"] = json!("");
        v["overlay_image"] = Value::Null;
        let r = validate(&v.to_string()).unwrap();
        assert_eq!(r.mask, None);
        assert_eq!(r.overlay_image, None);
    }

    #[test]
    fn whitespace_strings_are_kept_as_given() {
        let mut v = full();
        v["result"] = json!("  ");
        v["mask"] = json!(" ");
        let r = validate(&v.to_string()).unwrap();
        assert_eq!(r.result, "  ");
        // Kept so the card shows its placeholder rather than vanishing.
        assert_eq!(r.mask.as_deref(), Some(" "));
    }

    #[test]
    fn single_item_array_is_unwrapped() {
        let body = json!([full()]).to_string();
        assert_eq!(validate(&body).unwrap().result, "Tumor detectado");
    }

    #[test]
    fn other_top_level_shapes_are_rejected() {
        assert_eq!(validate("[]"), Err(SubmitError::WrongType("<root>")));
        assert_eq!(validate("\"ok\""), Err(SubmitError::WrongType("<root>")));
        let two = json!([full(), full()]).to_string();
        assert_eq!(validate(&two), Err(SubmitError::WrongType("<root>")));
    }
}

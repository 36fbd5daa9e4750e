//! Request body helpers shared by the resource handlers.

use serde_json::{Map, Number, Value};

use crate::store::{CREATED_AT_FIELD, ID_FIELD};

use super::errors::{ApiError, ApiResult};

/// Fields clients may never write directly
pub const SERVER_FIELDS: [&str; 2] = [ID_FIELD, CREATED_AT_FIELD];

/// Require a JSON object body and drop server-managed fields
pub fn writable_fields(body: Value, protected: &[&str]) -> ApiResult<Map<String, Value>> {
    let Value::Object(mut obj) = body else {
        return Err(ApiError::BadRequest("Request body must be a JSON object".to_string()));
    };
    for field in SERVER_FIELDS.iter().chain(protected) {
        obj.remove(*field);
    }
    Ok(obj)
}

/// Non-empty trimmed string field, at most `max_len` characters
pub fn required_text(obj: &mut Map<String, Value>, field: &str, max_len: usize) -> ApiResult<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        _ => return Err(ApiError::BadRequest(format!("Please add a {}", field))),
    }
    optional_text(obj, field, max_len).map(Option::unwrap_or_default)
}

/// Validate a string field only when present; trims it in place
pub fn optional_text(
    obj: &mut Map<String, Value>,
    field: &str,
    max_len: usize,
) -> ApiResult<Option<String>> {
    let text = match obj.get(field) {
        None => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(ApiError::BadRequest(format!("{} must be a string", field))),
    };
    if text.is_empty() {
        return Err(ApiError::BadRequest(format!("Please add a {}", field)));
    }
    if text.chars().count() > max_len {
        return Err(ApiError::BadRequest(format!(
            "{} can not be more than {} characters",
            field, max_len
        )));
    }
    obj.insert(field.to_string(), Value::String(text.clone()));
    Ok(Some(text))
}

/// Required numeric field; numeric strings are cast and stored as numbers
pub fn required_number(obj: &mut Map<String, Value>, field: &str) -> ApiResult<f64> {
    optional_number(obj, field)?.ok_or_else(|| ApiError::BadRequest(format!("Please add a {}", field)))
}

pub fn optional_number(obj: &mut Map<String, Value>, field: &str) -> ApiResult<Option<f64>> {
    let number = match obj.get(field) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let number = number
        .filter(|n| n.is_finite())
        .ok_or_else(|| ApiError::BadRequest(format!("{} must be a number", field)))?;

    obj.insert(field.to_string(), number_value(number));
    Ok(Some(number))
}

/// Integral values are stored as integers
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Value must be one of `allowed`
pub fn one_of(obj: &Map<String, Value>, field: &str, allowed: &[&str]) -> ApiResult<()> {
    match obj.get(field) {
        None => Ok(()),
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        Some(_) => Err(ApiError::BadRequest(format!(
            "{} must be one of: {}",
            field,
            allowed.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_writable_fields_drops_server_fields() {
        let fields = writable_fields(
            json!({"_id": "x", "createdAt": "t", "user": "u", "name": "n"}),
            &["user"],
        )
        .unwrap();
        assert_eq!(Value::Object(fields), json!({"name": "n"}));
        assert!(writable_fields(json!([1, 2]), &[]).is_err());
    }

    #[test]
    fn test_required_text() {
        let mut o = obj(json!({"name": "  Devworks  ", "blank": "  "}));
        assert_eq!(required_text(&mut o, "name", 50).unwrap(), "Devworks");
        assert_eq!(o["name"], json!("Devworks"));
        assert!(required_text(&mut o, "blank", 50).is_err());
        assert!(required_text(&mut o, "missing", 50).is_err());
        assert!(required_text(&mut o, "name", 3).is_err());
    }

    #[test]
    fn test_numbers_are_cast() {
        let mut o = obj(json!({"tuition": "8000", "weeks": 12.5, "bad": "x"}));
        assert_eq!(required_number(&mut o, "tuition").unwrap(), 8000.0);
        assert_eq!(o["tuition"], json!(8000));
        assert_eq!(optional_number(&mut o, "weeks").unwrap(), Some(12.5));
        assert!(optional_number(&mut o, "bad").is_err());
        assert_eq!(optional_number(&mut o, "missing").unwrap(), None);
    }

    #[test]
    fn test_one_of() {
        let o = obj(json!({"minimumSkill": "beginner"}));
        assert!(one_of(&o, "minimumSkill", &["beginner", "advanced"]).is_ok());
        assert!(one_of(&o, "minimumSkill", &["advanced"]).is_err());
        assert!(one_of(&o, "other", &["advanced"]).is_ok());
    }
}

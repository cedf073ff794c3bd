use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;

/// Success body for `POST /upload`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

/// JSON body accepted by `POST /generate-sas`.
/// Both fields are optional here so that absence becomes a validation error.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SasRequest {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub filename: Option<String>,
}

/// Accepts any JSON scalar as text. `null`, `false` and `0` count as absent.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::Bool(true) => Ok(Some("true".to_string())),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(None),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(D::Error::custom(
            "expected a string, number or boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> SasRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_numeric_fields_become_text() {
        let request = parse(r#"{"username": 123, "filename": "a.txt"}"#);
        assert_eq!(request.username.as_deref(), Some("123"));
        assert_eq!(request.filename.as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_falsy_scalars_are_absent() {
        let request = parse(r#"{"username": 0, "filename": false}"#);
        assert_eq!(request.username, None);
        assert_eq!(request.filename, None);

        let request = parse(r#"{"username": null}"#);
        assert_eq!(request.username, None);
        assert_eq!(request.filename, None);
    }

    #[test]
    fn test_nested_values_are_rejected() {
        let result: Result<SasRequest, _> =
            serde_json::from_str(r#"{"username": ["alice"], "filename": "a.txt"}"#);
        assert!(result.is_err());
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SasResponse {
    #[serde(rename = "sasUrl")]
    pub sas_url: String,
}

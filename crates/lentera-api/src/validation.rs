//! Validated JSON request bodies
//!
//! [`ValidJson`] deserializes the body and runs its `validator` rules.
//! Unparseable bodies become a 400 "Cannot parse request body"; rule
//! violations become a 400 with a `field -> message` map. Nested structs and
//! lists report dotted paths such as `sessions[1].session_topic`.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::AppError;

/// JSON body that passed its validation rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            debug!(reason = %rejection.body_text(), "Rejected request body");
            AppError::BadRequest("Cannot parse request body".to_string())
        })?;

        value.validate().map_err(validation_error)?;
        Ok(ValidJson(value))
    }
}

/// Flatten validator output into the envelope's `errors` map
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields = HashMap::new();
    flatten(&errors, "", &mut fields);
    AppError::Validation(fields)
}

fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut HashMap<String, String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(first) = list.first() {
                    let message = first
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{path} is invalid ({})", first.code));
                    out.insert(path, message);
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Item {
        #[validate(length(min = 1, message = "Topic is required"))]
        topic: String,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Batch {
        #[validate(email)]
        email: String,
        #[validate(nested)]
        items: Vec<Item>,
    }

    #[test]
    fn test_flatten_nested_paths() {
        let batch = Batch {
            email: "nope".to_string(),
            items: vec![
                Item {
                    topic: "Algebra".to_string(),
                },
                Item {
                    topic: String::new(),
                },
            ],
        };

        let AppError::Validation(fields) = validation_error(batch.validate().unwrap_err()) else {
            panic!("expected a validation error");
        };
        assert_eq!(fields.get("items[1].topic").map(String::as_str), Some("Topic is required"));
        assert!(fields.get("email").unwrap().contains("email"));
        assert_eq!(fields.len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        let result = ValidJson::<Batch>::from_request(request, &()).await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "Cannot parse request body"));
    }
}

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::{Validate, ValidationError};

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON and rule violations are both 400s in the standard error
/// envelope.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e.body_text())))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string with rejections in the standard error envelope.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid query: {}", e.body_text())))?;
        Ok(QueryParams(value))
    }
}

pub fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_must_be_positive"));
    }
    Ok(())
}

pub fn non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(ValidationError::new("amount_must_not_be_negative"));
    }
    Ok(())
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("must_not_be_blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Payment {
        #[validate(custom(function = "positive_amount"))]
        amount: Decimal,
    }

    async fn handler(ValidatedJson(p): ValidatedJson<Payment>) -> impl IntoResponse {
        p.amount.to_string()
    }

    async fn status_for(body: &str) -> StatusCode {
        let app = Router::new().route("/", post(handler));
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn rejects_bad_json_and_rule_violations() {
        assert_eq!(status_for(r#"{"amount":"12.50"}"#).await, StatusCode::OK);
        assert_eq!(status_for(r#"{"amount":"0"}"#).await, StatusCode::BAD_REQUEST);
        assert_eq!(status_for(r#"{"amount":"#).await, StatusCode::BAD_REQUEST);
    }
}

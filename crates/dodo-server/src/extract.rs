//! Request extractors with the API's error shape.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use dodo_core::bearer_token;
use dodo_core::dates::parse_date;

use crate::error::ApiError;
use crate::SharedState;

/// The authenticated user id.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header)?;
        let user_id = state.auth.user_for_token(token).await?;
        Ok(CurrentUser(user_id))
    }
}

/// JSON body; malformed or mistyped bodies become a 400.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => {
                tracing::debug!(%rejection, "rejected request body");
                Err(ApiError::invalid_payload())
            }
        }
    }
}

/// Query string; undecodable parameters become a 400.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => {
                tracing::debug!(%rejection, "rejected query string");
                Err(ApiError::invalid_payload())
            }
        }
    }
}

/// `{ "date": "YYYY-MM-DD" }`, where both the field and the whole body may be
/// omitted.
#[derive(Debug, Default, Deserialize)]
pub struct DateBody {
    #[serde(default)]
    pub date: Option<String>,
}

impl DateBody {
    pub fn parse(body: &Bytes) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|_| ApiError::invalid_payload())
    }
}

/// The requested day, or `today` when none was given.
pub fn day_or_today(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => Ok(parse_date(value).map_err(dodo_core::CoreError::from)?),
        None => Ok(today),
    }
}

/// Empty query values count as absent.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_body_accepts_empty_and_missing_field() {
        assert!(DateBody::parse(&Bytes::new()).unwrap().date.is_none());
        assert!(DateBody::parse(&Bytes::from_static(b"{}")).unwrap().date.is_none());
        let body = DateBody::parse(&Bytes::from_static(br#"{"date":"2024-03-01"}"#)).unwrap();
        assert_eq!(body.date.as_deref(), Some("2024-03-01"));
        assert!(DateBody::parse(&Bytes::from_static(b"{oops")).is_err());
    }

    #[test]
    fn day_or_today_falls_back() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(day_or_today(None, today).unwrap(), today);
        assert_eq!(day_or_today(Some(" "), today).unwrap(), today);
        assert_eq!(
            day_or_today(Some("2024-03-01"), today).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        let err = day_or_today(Some("03/01/2024"), today).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date value.");
    }
}

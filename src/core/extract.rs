//! Estrattori che convertono i rifiuti di axum in `AppError`,
//! così anche un body JSON malformato risponde con il formato d'errore comune

use crate::core::AppError;
use axum::extract::{OptionalFromRequest, Request};
use axum_macros::FromRequest;
use axum_macros::FromRequestParts;
use serde::de::DeserializeOwned;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Option<ApiJson<T>>`: senza Content-Type il body è assente, altrimenti deve essere JSON valido
impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let body = <axum::Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(body.map(|axum::Json(value)| ApiJson(value)))
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

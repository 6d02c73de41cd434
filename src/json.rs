use axum::extract::{FromRequest, Request, rejection::JsonRejection};

use crate::error::AppError;

/// Json
///
/// Drop-in for `axum::Json` on request bodies. A body that is not valid JSON, or does not
/// fit the target type, is rejected as `AppError::Validation` so the client still gets the
/// usual `{"error": ...}` shape instead of axum's plain-text rejection.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

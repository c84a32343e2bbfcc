use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use log::*;
use serde::de::DeserializeOwned;

/// JSON body of a workflow stream request.
///
/// A request without a JSON `Content-Type`, or with an empty body, yields the
/// payload's default. Malformed JSON, mistyped fields and bodies over the
/// router's body limit are rejected with their own status, so no upstream
/// call is made for them.
pub(crate) struct WorkflowPayload<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for WorkflowPayload<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = JsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Ok(Self(T::default()));
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            warn!("Failed to read workflow request body: {rejection}");
            JsonRejection::from(rejection)
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let Json(payload) = Json::<T>::from_bytes(&bytes).map_err(|rejection| {
            warn!("Rejecting workflow request body: {rejection}");
            rejection
        })?;
        Ok(Self(payload))
    }
}

/// `application/json` or any `application/*+json` media type.
fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

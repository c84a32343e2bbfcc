use crate::error::Error;
use axum::body::Bytes;
use log::*;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;

/// Immutable description of the single upstream call a relay session makes.
///
/// The bearer credential is stored as a sensitive header value, so it is
/// redacted from `Debug` output.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Bytes,
}

impl UpstreamRequest {
    /// Describes a `POST` of `payload` as JSON to `url`, authenticated with
    /// `bearer` and asking for an event-stream response.
    pub fn post_json<T: Serialize>(
        url: impl Into<String>,
        bearer: &str,
        payload: &T,
    ) -> Result<Self, Error> {
        let mut auth_header =
            HeaderValue::from_str(&format!("Bearer {bearer}")).map_err(|err| {
                warn!("Failed to create authorization header value: {err:?}");
                Error::Configuration(
                    "upstream credential is not a valid HTTP header value".to_string(),
                )
            })?;
        auth_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_header);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let body = serde_json::to_vec(payload).map_err(|err| {
            warn!("Failed to serialize upstream request body: {err:?}");
            Error::transport(&err)
        })?;

        Ok(Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: Bytes::from(body),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub(crate) fn to_reqwest(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        client
            .request(self.method.clone(), &self.url)
            .headers(self.headers.clone())
            .body(self.body.clone())
    }
}

//! Per-request context handed to actions.
//!
//! One `RequestContext` is built by the dispatcher for each inbound request and dropped
//! when the response is produced. It is never shared across requests.

use std::{net::SocketAddr, sync::Mutex};

use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header, request::Parts},
    response::Response,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::AppError;
use crate::services::auth::cookie::{SetCookie, get_cookie};
use crate::services::auth::identity::Identity;

/// Response under construction.
///
/// Records the status the action writes so the dispatcher can log it; an action that
/// never writes a status yields 200.
#[derive(Debug, Default)]
pub struct ResponseSink {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseSink {
    /// Set the status code. Only the first call takes effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(written) => warn!(
                written = written.as_u16(),
                ignored = status.as_u16(),
                "superfluous write_header call"
            ),
            None => self.status = Some(status),
        }
    }

    /// Append to the body. Writing a body without a status implies 200.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

pub struct RequestContext {
    parts: Parts,
    // Mutex only keeps the context `Sync`; the body is always reached through `&mut self`.
    body: Mutex<Option<Body>>,
    body_limit: usize,
    response: ResponseSink,
    identity: Option<Identity>,
    remote_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("identity", &self.identity.as_ref().map(|i| i.id))
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

impl RequestContext {
    pub fn new(request: Request, remote_addr: Option<SocketAddr>, body_limit: usize) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Mutex::new(Some(body)),
            body_limit,
            response: ResponseSink::default(),
            identity: None,
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Non-empty value of a request header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Non-empty value of a request cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        get_cookie(&self.parts.headers, name)
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn response(&self) -> &ResponseSink {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseSink {
        &mut self.response
    }

    pub fn set_cookie(&mut self, cookie: &SetCookie) -> Result<(), AppError> {
        let value = cookie.to_header_value().map_err(|e| {
            AppError::Internal(anyhow!("cookie {} is not a valid header: {e}", cookie.name()))
        })?;
        self.response.headers_mut().append(header::SET_COOKIE, value);
        Ok(())
    }

    /// Read the request body (bounded by the body limit) and decode it as JSON.
    pub async fn decode_model<T: DeserializeOwned>(&mut self) -> Result<T, AppError> {
        let body = self
            .body
            .get_mut()
            .map_err(|_| AppError::Internal(anyhow!("request body lock poisoned")))?
            .take()
            .ok_or_else(|| AppError::validation("request body already consumed"))?;

        let bytes = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(|e| AppError::validation(format!("failed to read request body: {e}")))?;

        serde_json::from_slice(&bytes).map_err(|e| AppError::validation(e.to_string()))
    }

    /// Write `value` as JSON with the given status.
    pub fn finish<T: Serialize>(&mut self, status: StatusCode, value: Option<&T>) -> Result<(), AppError> {
        let body = match value {
            Some(value) => Some(serde_json::to_vec(value).map_err(anyhow::Error::from)?),
            None => None,
        };

        if body.is_some() {
            self.response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        self.response.write_header(status);
        if let Some(body) = body {
            self.response.write(&body);
        }
        Ok(())
    }

    pub fn into_response(self) -> Response {
        self.response.into_response()
    }
}

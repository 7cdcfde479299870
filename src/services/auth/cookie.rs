//! Cookie names and helpers for the token transport.

use std::fmt;

use axum::http::{HeaderMap, HeaderValue, header, header::InvalidHeaderValue};

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_NAME: &str = "access_token";

/// Cookie (and fallback header) carrying the refresh token.
pub const REFRESH_TOKEN_NAME: &str = "refresh_token";

/// Extract a cookie value from the `Cookie` header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// A `Set-Cookie` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    max_age: u64,
    path: Option<String>,
    secure: bool,
    http_only: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, max_age: u64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age,
            path: None,
            secure: false,
            http_only: false,
        }
    }

    /// Cookie that tells the client to drop `name` immediately.
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "", 0)
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Max-Age={}", self.name, self.value, self.max_age)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(cookie));
        headers
    }

    #[test]
    fn finds_cookie_among_several() {
        let headers = headers("foo=bar; access_token=abc123; refresh_token=xyz789");
        assert_eq!(get_cookie(&headers, ACCESS_TOKEN_NAME), Some("abc123"));
        assert_eq!(get_cookie(&headers, REFRESH_TOKEN_NAME), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn tolerates_whitespace() {
        let headers = headers("  access_token = abc123  ; foo=bar");
        assert_eq!(get_cookie(&headers, ACCESS_TOKEN_NAME), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        assert_eq!(get_cookie(&HeaderMap::new(), ACCESS_TOKEN_NAME), None);
        assert_eq!(get_cookie(&headers("foo=bar"), ACCESS_TOKEN_NAME), None);
        assert_eq!(get_cookie(&headers("access_token="), ACCESS_TOKEN_NAME), None);
    }

    #[test]
    fn reads_every_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("foo=bar"));
        headers.append(header::COOKIE, HeaderValue::from_static("refresh_token=r1"));
        assert_eq!(get_cookie(&headers, REFRESH_TOKEN_NAME), Some("r1"));
    }

    #[test]
    fn renders_flags_only_when_set() {
        let plain = SetCookie::new(ACCESS_TOKEN_NAME, "tok", 900);
        assert_eq!(plain.to_string(), "access_token=tok; Max-Age=900");

        let full = SetCookie::new(REFRESH_TOKEN_NAME, "tok", 60)
            .path("/api/v1/session")
            .secure(true)
            .http_only(true);
        assert_eq!(
            full.to_string(),
            "refresh_token=tok; Max-Age=60; Path=/api/v1/session; Secure; HttpOnly"
        );
    }

    #[test]
    fn expired_cookie_has_zero_max_age() {
        let cookie = SetCookie::expired(ACCESS_TOKEN_NAME).path("/");
        assert_eq!(cookie.to_string(), "access_token=; Max-Age=0; Path=/");
    }
}

//! Caller identity asserted by the upstream auth layer.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use storyteller_core::user::{UserIdentity, UserType};
use tracing::warn;

pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_TYPE_HEADER: &str = "x-user-type";

/// The session claim of the request, if any.
///
/// A request without an email header carries no identity. A missing or
/// unknown user type is treated as `regular`.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<UserIdentity>);

impl Caller {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(email) = header_str(headers, USER_EMAIL_HEADER).filter(|email| !email.is_empty())
        else {
            return Self(None);
        };
        let user_type = match header_str(headers, USER_TYPE_HEADER) {
            None => UserType::Regular,
            Some(raw) => raw.parse::<UserType>().unwrap_or_else(|error: String| {
                warn!(%error, "unrecognized user type header, treating as regular");
                UserType::Regular
            }),
        };
        Self(Some(UserIdentity {
            email: email.to_owned(),
            user_type,
        }))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_no_email_means_no_identity() {
        let headers = HeaderMap::new();

        assert!(Caller::from_headers(&headers).0.is_none());
    }

    #[test]
    fn test_guest_type_is_read_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("guest-1@example.com"));
        headers.insert(USER_TYPE_HEADER, HeaderValue::from_static("guest"));

        let identity = Caller::from_headers(&headers).0.unwrap();

        assert_eq!(identity.email, "guest-1@example.com");
        assert!(identity.is_guest());
    }

    #[test]
    fn test_missing_or_unknown_type_defaults_to_regular() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("reader@example.com"));
        let without_type = Caller::from_headers(&headers).0.unwrap();
        headers.insert(USER_TYPE_HEADER, HeaderValue::from_static("admin"));
        let unknown_type = Caller::from_headers(&headers).0.unwrap();

        assert_eq!(without_type.user_type, UserType::Regular);
        assert_eq!(unknown_type.user_type, UserType::Regular);
    }
}

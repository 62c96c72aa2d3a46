use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{decode_jwt, SessionClaims};
use crate::state::AppState;

/// Session attached to every request; `None` when unauthenticated
#[derive(Clone, Debug, Default)]
pub struct Session(pub Option<SessionClaims>);

impl Session {
    pub fn claims(&self) -> Option<&SessionClaims> {
        self.0.as_ref()
    }
}

/// Decodes the bearer token, if any, into a [`Session`]
///
/// Never rejects: a missing or invalid token yields an empty session and the
/// handler decides whether that is acceptable.
pub async fn session_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match extract_jwt_from_headers(&headers) {
        Ok(Some(token)) => match decode_jwt(&token, &state.jwt_secret) {
            Ok(claims) => Session(Some(claims)),
            Err(e) => {
                tracing::warn!("Rejected session token: {}", e);
                Session(None)
            }
        },
        Ok(None) => Session(None),
        Err(msg) => {
            tracing::warn!("{}", msg);
            Session(None)
        }
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(Some(token.trim().to_string()))
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers), Ok(Some("abc.def.ghi".to_string())));
    }

    #[test]
    fn missing_header_is_no_session() {
        assert_eq!(extract_jwt_from_headers(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn non_bearer_scheme_is_an_error() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(extract_jwt_from_headers(&headers).is_err());
    }
}

// SPDX-License-Identifier: MIT

//! Bearer-token authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that requires a valid session credential.
///
/// On success the decoded [`Claims`](crate::auth::Claims) are inserted as a
/// request extension for handlers to consume.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::Unauthorized)?;

    let claims = state.codec.decode(&token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Pull the token out of an `Authorization: Bearer …` header.
pub(crate) fn bearer_token(request: &Request) -> Option<String> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    header.strip_prefix("Bearer ").map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .uri("/ticket")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_bearer_extraction() {
        let req = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&req), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let req = request_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&req), None);

        let no_header = Request::builder()
            .uri("/ticket")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&no_header), None);
    }
}

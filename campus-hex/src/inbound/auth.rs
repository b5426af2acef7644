//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use campus_types::{PaymentGateway, RegistrationRepository};

use super::handlers::AppState;

/// Extracts the API key from the Authorization header.
/// Expected format: "Bearer <api_key>" or just "<api_key>"
fn extract_api_key(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    match header.strip_prefix("Bearer ") {
        Some(key) => Some(key),
        None => Some(header),
    }
}

/// Paths that never require an API key.
///
/// - `/health` - liveness probe
/// - `POST /api/bootstrap` - creates the first key (has its own guard)
/// - `/docs`, `/api-docs` - interactive API documentation
fn is_public(request: &Request<Body>) -> bool {
    let path = request.uri().path();
    if path == "/health" || path.starts_with("/docs") || path.starts_with("/api-docs") {
        return true;
    }
    path == "/api/bootstrap" && request.method() == axum::http::Method::POST
}

/// Authentication middleware that validates API keys.
///
/// Extracts the key from the Authorization header, hashes it with SHA-256
/// and looks the hash up in the store. Returns 401 when validation fails.
pub async fn auth_middleware<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(&request) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let api_key = match extract_api_key(auth_header) {
        Some(key) if !key.is_empty() => key,
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let key_hash = campus_repo::security::hash_api_key(api_key);

    match state.service.repo().verify_api_key_hash(&key_hash).await {
        Ok(Some(_api_key)) => next.run(request).await,
        Ok(None) => unauthorized_response("Invalid API key"),
        Err(e) => {
            tracing::error!("API key verification failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Internal server error",
                    "code": 500
                })),
            )
                .into_response()
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_api_key_bearer() {
        assert_eq!(
            extract_api_key(Some("Bearer ck_test_123")),
            Some("ck_test_123")
        );
    }

    #[test]
    fn test_extract_api_key_raw() {
        assert_eq!(extract_api_key(Some("ck_test_123")), Some("ck_test_123"));
    }

    #[test]
    fn test_extract_api_key_none() {
        assert_eq!(extract_api_key(None), None);
    }

    #[test]
    fn test_bootstrap_is_public_only_for_post() {
        let post = Request::builder()
            .method("POST")
            .uri("/api/bootstrap")
            .body(Body::empty())
            .unwrap();
        let get = Request::builder()
            .uri("/api/bootstrap")
            .body(Body::empty())
            .unwrap();

        assert!(is_public(&post));
        assert!(!is_public(&get));
    }
}

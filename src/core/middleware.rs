use crate::core::error::AppError;
use crate::features::auth::model::{AuthenticatedUser, UserRole};
use crate::shared::constants::{USER_ID_HEADER, USER_ROLE_HEADER};
use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        // Parse origins into HeaderValue
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            Err((
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"Swagger UI\"")],
                "Unauthorized",
            )
                .into_response())
        })
    }
}

/// Turn the identity headers forwarded by the gateway into an `AuthenticatedUser`
/// request extension. Requests without a usable identity are rejected.
pub async fn identity_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user = identity_from_headers(req.headers())?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Missing role header means a plain user
fn identity_from_headers(headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let raw_id = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Auth(format!("Missing {} header", USER_ID_HEADER)))?;

    let user_id = raw_id
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Auth(format!("Invalid {} header", USER_ID_HEADER)))?;

    let role = match headers.get(USER_ROLE_HEADER) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.parse::<UserRole>().ok())
            .ok_or_else(|| AppError::Auth(format!("Invalid {} header", USER_ROLE_HEADER)))?,
        None => UserRole::User,
    };

    Ok(AuthenticatedUser::new(user_id, role))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_identity_from_headers() {
        let user =
            identity_from_headers(&headers(&[("x-user-id", "42"), ("x-user-role", "evaluator")]))
                .unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.role, UserRole::Evaluator);
    }

    #[test]
    fn test_missing_role_defaults_to_user() {
        let user = identity_from_headers(&headers(&[("x-user-id", "5")])).unwrap();
        assert_eq!(user.role, UserRole::User);
    }

    #[test]
    fn test_bad_identity_is_rejected() {
        for pairs in [
            vec![],
            vec![("x-user-id", "abc")],
            vec![("x-user-id", "0")],
            vec![("x-user-id", "3"), ("x-user-role", "root")],
        ] {
            assert!(matches!(
                identity_from_headers(&headers(&pairs)),
                Err(AppError::Auth(_))
            ));
        }
    }
}

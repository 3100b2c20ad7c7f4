use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use staffhub_core::{Actor, AppError, AppResult, UserId};

use crate::error::ApiResult;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-staffhub-user";
pub const USER_NAME_HEADER: &str = "x-staffhub-user-name";
pub const USER_EMAIL_HEADER: &str = "x-staffhub-user-email";

/// Resolves the acting user from the headers set by the upstream auth proxy.
pub async fn require_actor(mut request: Request, next: Next) -> ApiResult<Response> {
    let actor = actor_from_headers(request.headers())?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

pub fn actor_from_headers(headers: &HeaderMap) -> AppResult<Actor> {
    let user = header_text(headers, USER_HEADER)?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    let user_id = UserId::new(user)
        .map_err(|_| AppError::Unauthorized("invalid user identity".to_owned()))?;
    let display_name = header_text(headers, USER_NAME_HEADER)?
        .unwrap_or_else(|| user_id.as_str().to_owned());
    let email = header_text(headers, USER_EMAIL_HEADER)?;

    Ok(Actor::new(user_id, display_name, email))
}

fn header_text(headers: &HeaderMap, name: &str) -> AppResult<Option<String>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(|text| text.trim().to_owned())
                .map_err(|_| AppError::Unauthorized(format!("header '{name}' is not valid text")))
        })
        .transpose()
        .map(|value| value.filter(|text| !text.is_empty()))
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method()) {
        let headers = request.headers();

        if let Some(fetch_site) = headers.get("sec-fetch-site") {
            if fetch_site == HeaderValue::from_static("cross-site") {
                return Err(AppError::Unauthorized("cross-site request blocked".to_owned()).into());
            }
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok());
        if let Some(origin) = origin {
            if origin != state.frontend_url {
                return Err(AppError::Unauthorized("origin validation failed".to_owned()).into());
            }
        }
    }

    Ok(next.run(request).await)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, Method};
    use staffhub_core::AppError;

    use super::{
        USER_EMAIL_HEADER, USER_HEADER, USER_NAME_HEADER, actor_from_headers,
        is_state_changing_method,
    };

    #[test]
    fn actor_is_read_from_proxy_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("u-42"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Dana Reyes"));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("dana@example.com"));

        let actor = actor_from_headers(&headers).unwrap_or_else(|_| unreachable!());
        assert_eq!(actor.user_id().as_str(), "u-42");
        assert_eq!(actor.display_name(), "Dana Reyes");
        assert_eq!(actor.email(), Some("dana@example.com"));
    }

    #[test]
    fn display_name_falls_back_to_user_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("u-7"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("   "));

        let actor = actor_from_headers(&headers).unwrap_or_else(|_| unreachable!());
        assert_eq!(actor.display_name(), "u-7");
        assert_eq!(actor.email(), None);
    }

    #[test]
    fn missing_user_is_unauthorized() {
        let result = actor_from_headers(&HeaderMap::new());
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn reads_are_not_origin_checked() {
        assert!(!is_state_changing_method(&Method::GET));
        assert!(is_state_changing_method(&Method::DELETE));
    }
}

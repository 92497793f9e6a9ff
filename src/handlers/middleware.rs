use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::handlers::helpers::current_user;
use crate::models::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if current_user(&state, &jar).is_some() {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "No session; redirecting to login");
        Redirect::to("/login").into_response()
    }
}

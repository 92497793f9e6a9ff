use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::models::AppState;

const DEFAULT_STYLESHEET: &str = include_str!("../static/styles.css");

async fn stylesheet() -> impl axum::response::IntoResponse {
    ([(axum::http::header::CONTENT_TYPE, "text/css")], DEFAULT_STYLESHEET)
}

pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/switch/:project_id", get(handlers::auth::switch_project))
        .route("/overview", get(handlers::overview::overview_get))
        .route("/overview/quotas.json", get(handlers::overview::quotas_json))
        .route("/instances", get(handlers::instances::instances_get))
        .route(
            "/instances/:instance_id/lease",
            get(handlers::instances::lease_get).post(handlers::instances::lease_post),
        )
        .route("/project_admin", get(handlers::project_admin::index_get))
        .route(
            "/project_admin/create",
            get(handlers::project_admin::create_get).post(handlers::project_admin::create_post),
        )
        .route("/project_admin/:project_id", get(handlers::project_admin::detail_get))
        .route(
            "/project_admin/:project_id/update",
            get(handlers::project_admin::update_get).post(handlers::project_admin::update_post),
        )
        .route("/project_admin/:project_id/inline", post(handlers::project_admin::inline_post))
        .route("/project_admin/:project_id/usage", get(handlers::project_admin::usage_get))
        .route("/usage", get(handlers::usage::usage_get))
        .route("/usage/project_data", get(handlers::usage::project_data))
        .route("/usage/instance_data", get(handlers::usage::instance_data))
        .route("/usage/warning", get(handlers::usage::usage_warning))
        .route("/logout", post(handlers::auth::logout_post))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), handlers::middleware::auth_middleware));

    Router::new()
        .route("/", get(handlers::auth::root_get))
        .route("/login", get(handlers::auth::login_get).post(handlers::auth::login_post))
        .route(
            "/static/styles.css",
            get(stylesheet).layer(SetResponseHeaderLayer::if_not_present(
                CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=3600"),
            )),
        )
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

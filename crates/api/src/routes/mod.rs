pub mod alerts;
pub mod checkresults;
pub mod checks;
pub mod checkstates;
pub mod configuration;
pub mod debug;
pub mod info;
pub mod periods;
pub mod peers;
pub mod roles;
pub mod subjects;
pub mod tags;
pub mod util;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::jsonp::jsonp_layer;
use crate::state::ApiState;

/// Builds the full route table (§6), wraps it in the JSONP, tracing, and (if
/// configured) CORS middleware, and binds `state`.
pub fn router(state: ApiState) -> Router {
    let mut router = Router::new()
        .route("/api/up", get(info::up))
        .route("/api/info", get(info::info))
        .route("/api/info/datastats", get(info::datastats))
        .route("/api/configuration/:name", get(configuration::get_configuration))
        .route("/api/peers", get(peers::get_peers))
        .route("/api/subjects", get(subjects::search).post(subjects::create))
        .route(
            "/api/subjects/:id",
            get(subjects::get).put(subjects::update).delete(subjects::delete),
        )
        .route("/api/checks", get(checks::search).post(checks::create))
        .route(
            "/api/checks/:id",
            get(checks::get).put(checks::update).delete(checks::delete),
        )
        .route("/api/alerts", get(alerts::search).post(alerts::create))
        .route(
            "/api/alerts/:id",
            get(alerts::get).put(alerts::update).delete(alerts::delete),
        )
        .route("/api/periods", get(periods::search).post(periods::create))
        .route(
            "/api/periods/:id",
            get(periods::get).put(periods::update).delete(periods::delete),
        )
        .route("/api/checkresults", post(checkresults::create))
        .route("/api/checkstates", get(checkstates::list))
        .route("/api/roles", get(roles::list))
        .route("/api/roles/:role", get(roles::get))
        .route("/api/tags", get(tags::list));

    if cfg!(debug_assertions) || cfg!(feature = "debug-routes") {
        router = router
            .route("/api/debug/metrics", get(debug::metrics))
            .route("/api/debug/peers", get(debug::peers))
            .route("/api/debug/uptime", get(debug::uptime));
    }

    let cors_origin = (!state.config().allow_cors.is_empty())
        .then(|| state.config().allow_cors.parse::<HeaderValue>().ok())
        .flatten();

    router = router
        .layer(axum::middleware::from_fn(jsonp_layer))
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = cors_origin {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers(tower_http::cors::Any),
        );
    }

    router.with_state(state)
}

use axum::http::{HeaderValue, Method, header};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use gradebook_config::CorsConfig;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::modules::grades::router::init_grades_router;
use crate::state::AppState;

pub fn init_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_config);
    let grades = init_grades_router(&state.import_config);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest("/api", Router::new().nest("/grades", grades))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
}

/// Origins that fail to parse as header values are skipped.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        // template downloads carry the filename here
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
}

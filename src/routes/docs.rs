use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Mount point of the interactive API explorer.
const SWAGGER_PATH: &str = "/docs";
/// Path serving the raw OpenAPI document.
const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Serve the Swagger UI backed by the generated OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::from(SwaggerUi::new(SWAGGER_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .with_state(state)
}

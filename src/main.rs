use actix_web::{App, HttpServer, web};
use pcos_planner::config::AppConfig;
use pcos_planner::server::{self, ApiDoc, AppState};
use tracing_subscriber::{EnvFilter, fmt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        std::io::Error::other(e)
    })?;

    if config.api_key.is_none() {
        tracing::warn!("DEFAULT_KEY is not set; relying on the provider's own environment variable");
    }

    tracing::info!(
        "Using model {} with a {}s upstream timeout (validation: {}, auth required: {})",
        config.model,
        config.upstream_timeout.as_secs(),
        config.validate_plans,
        config.require_auth
    );

    let state = web::Data::new(AppState::from_config(&config));

    tracing::info!(
        "Starting server at http://{}:{}/swagger-ui/",
        config.host,
        config.port
    );

    // OpenAPI documentation is served at /api-doc/openapi.json
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(server::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

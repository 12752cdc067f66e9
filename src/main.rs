use actix_web::{middleware, web, App, HttpServer};
use garden_layout::{api::openapi::ApiDoc, config::ServerConfig, LayoutEngine};
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Reads .env before the logger so RUST_LOG can live there too.
    let config = ServerConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let engine = web::Data::new(LayoutEngine::from_config(&config));
    let bind_addr = config.bind_addr.clone();
    info!("🌱 Garden layout API started at http://{bind_addr}");
    info!("   POST   /api/layout");
    info!("   DELETE /api/layout/{{gardenId}}");
    info!("   GET    /api/growth-stages");
    info!("   POST   /api/plants/footprint");
    info!("   POST   /api/plants/compatibility");
    info!("   📖 Swagger UI → http://{bind_addr}/swagger-ui/");
    info!(
        "   {} zone workers, cache of {} layouts kept {} s",
        engine.pool_size(),
        config.cache_capacity,
        config.cache_ttl.as_secs()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(engine.clone())
            .configure(garden_layout::api::routes::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = format!("JSON deserialization error: {err}");
                actix_web::error::InternalError::from_response(
                    err,
                    actix_web::HttpResponse::BadRequest()
                        .json(serde_json::json!({ "error": message })),
                )
                .into()
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}

use std::collections::HashMap;

use actix_web::{delete, http::Method, post, web, HttpResponse, Responder};
use log::{info, warn};

use crate::{
    api::handlers::error_response,
    logic::engine::LayoutEngine,
    models::{
        layout::LayoutWarning,
        request::{link, ApiResponse, ErrorResponse, LayoutApiResponse, LayoutRequest},
    },
};

fn describe(warning: &LayoutWarning) -> String {
    match warning {
        LayoutWarning::UnplacedPlants { count } => {
            format!("{count} plant(s) could not be placed")
        }
        LayoutWarning::Timeout {
            deadline_ms,
            incomplete_zones,
        } => format!(
            "deadline of {deadline_ms} ms reached with {incomplete_zones} zone(s) unfinished"
        ),
    }
}

/// POST /api/layout
/// Assigns the given plants to the garden's zones.
#[utoipa::path(
    post,
    path = "/api/layout",
    tag = "layout",
    request_body = LayoutRequest,
    responses(
        (status = 200, description = "Layout computed; `status` is PARTIAL when some plants were left out or the deadline hit", body = LayoutApiResponse),
        (status = 400, description = "Invalid garden, plants or parameters", body = ErrorResponse),
        (status = 500, description = "The optimization failed", body = ErrorResponse),
    )
)]
#[post("/layout")]
pub async fn post_layout(
    engine: web::Data<LayoutEngine>,
    body: web::Json<LayoutRequest>,
) -> impl Responder {
    let LayoutRequest {
        garden,
        plants,
        params,
    } = body.into_inner();
    let params = params.unwrap_or_default();

    match engine.compute_layout(&garden, &plants, &params).await {
        Ok(layout) => {
            let garden_id = layout.garden_id.clone();
            let errors = layout.warnings.iter().map(describe).collect();
            let mut links = HashMap::new();
            links.insert("self".into(), link("/api/layout", Method::POST));
            links.insert(
                "invalidate".into(),
                link(format!("/api/layout/{garden_id}"), Method::DELETE),
            );
            links.insert("growthStages".into(), link("/api/growth-stages", Method::GET));
            HttpResponse::Ok().json(ApiResponse::new(layout, links).with_errors(errors))
        }
        Err(e) => {
            warn!("layout request for garden '{}' failed: {e}", garden.id);
            error_response(&e)
        }
    }
}

/// DELETE /api/layout/{garden_id}
/// Drops every cached layout of a garden.
#[utoipa::path(
    delete,
    path = "/api/layout/{garden_id}",
    tag = "layout",
    params(("garden_id" = String, Path, description = "Garden whose cached layouts are dropped")),
    responses((status = 204, description = "Cached layouts dropped"))
)]
#[delete("/layout/{garden_id}")]
pub async fn delete_layout(
    engine: web::Data<LayoutEngine>,
    path: web::Path<String>,
) -> impl Responder {
    let garden_id = path.into_inner();
    engine.invalidate_garden(&garden_id);
    info!("cached layouts for garden '{garden_id}' invalidated");
    HttpResponse::NoContent().finish()
}

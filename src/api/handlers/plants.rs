use std::collections::HashMap;

use actix_web::{get, http::Method, post, web, HttpResponse, Responder};
use chrono::Utc;

use crate::{
    api::handlers::error_response,
    error::Result,
    logic::{
        compatibility::{companion_pairs, incompatible_pairs, zone_companion_score},
        engine::resolve_params,
        spacing::{SpacingCalculator, GROWTH_STAGE_MULTIPLIERS},
    },
    models::{
        plant::{GrowthStage, Plant},
        request::{
            link, ApiResponse, CompatibilityApiResponse, CompatibilityRequest,
            CompatibilityResponse, ErrorResponse, FootprintApiResponse, FootprintRequest,
            FootprintResponse, GrowthStageEntry, GrowthStageListResponse, PaginatedResponse,
            Pagination, PlantFootprint,
        },
    },
};

/// GET /api/growth-stages
/// Lists the footprint multiplier applied at each growth stage.
#[utoipa::path(
    get,
    path = "/api/growth-stages",
    tag = "plants",
    responses((status = 200, description = "Growth stage multipliers", body = GrowthStageListResponse))
)]
#[get("/growth-stages")]
pub async fn list_growth_stages() -> impl Responder {
    let stages: Vec<GrowthStageEntry> = GROWTH_STAGE_MULTIPLIERS
        .iter()
        .map(|&(stage, multiplier)| GrowthStageEntry { stage, multiplier })
        .collect();
    let total = stages.len();
    let mut links = HashMap::new();
    links.insert("self".into(), link("/api/growth-stages", Method::GET));
    links.insert("footprint".into(), link("/api/plants/footprint", Method::POST));
    HttpResponse::Ok().json(PaginatedResponse::new(
        stages,
        links,
        Pagination {
            page: 1,
            per_page: total,
            total,
            total_pages: 1,
        },
    ))
}

fn footprint_of(calculator: &SpacingCalculator, plant: &Plant) -> Result<PlantFootprint> {
    Ok(PlantFootprint {
        plant_id: plant.id.clone(),
        growth_stage: plant.growth_stage,
        multiplier: calculator.multiplier(plant.growth_stage),
        footprint: calculator.required_footprint(plant)?,
        mature_footprint: calculator.footprint_at(plant, GrowthStage::Mature)?,
    })
}

/// POST /api/plants/footprint
/// Computes the area each plant needs at its current stage and once mature.
#[utoipa::path(
    post,
    path = "/api/plants/footprint",
    tag = "plants",
    request_body = FootprintRequest,
    responses(
        (status = 200, description = "Per-plant footprints", body = FootprintApiResponse),
        (status = 400, description = "A plant has an unusable spacing", body = ErrorResponse),
    )
)]
#[post("/plants/footprint")]
pub async fn post_footprint(body: web::Json<FootprintRequest>) -> impl Responder {
    let FootprintRequest { plants, params } = body.into_inner();
    let params = resolve_params(&params.unwrap_or_default(), Utc::now());
    let calculator = SpacingCalculator::from_params(&params);

    let footprints: Result<Vec<PlantFootprint>> = plants
        .iter()
        .map(|plant| footprint_of(&calculator, plant))
        .collect();
    match footprints {
        Ok(footprints) => {
            let total_footprint = footprints.iter().map(|f| f.footprint).sum();
            let mut links = HashMap::new();
            links.insert("self".into(), link("/api/plants/footprint", Method::POST));
            links.insert("growthStages".into(), link("/api/growth-stages", Method::GET));
            HttpResponse::Ok().json(ApiResponse::new(
                FootprintResponse {
                    footprints,
                    total_footprint,
                },
                links,
            ))
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/plants/compatibility
/// Reports companion and incompatible pairs among the given plants.
#[utoipa::path(
    post,
    path = "/api/plants/compatibility",
    tag = "plants",
    request_body = CompatibilityRequest,
    responses((status = 200, description = "Pairwise compatibility", body = CompatibilityApiResponse))
)]
#[post("/plants/compatibility")]
pub async fn post_compatibility(body: web::Json<CompatibilityRequest>) -> impl Responder {
    let plants = body.into_inner().plants;
    let companions = companion_pairs(&plants);
    let incompatible = incompatible_pairs(&plants);
    let shared_zone_score = if incompatible.is_empty() {
        let refs: Vec<&Plant> = plants.iter().collect();
        Some(zone_companion_score(&refs))
    } else {
        None
    };

    let mut links = HashMap::new();
    links.insert("self".into(), link("/api/plants/compatibility", Method::POST));
    links.insert("layout".into(), link("/api/layout", Method::POST));
    HttpResponse::Ok().json(ApiResponse::new(
        CompatibilityResponse {
            companions,
            incompatible,
            shared_zone_score,
        },
        links,
    ))
}

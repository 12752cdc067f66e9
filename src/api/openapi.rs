use utoipa::OpenApi;

use crate::models::{
    garden::{Garden, SunlightCondition, Zone},
    layout::{
        Assignment, ExcludedZone, ExclusionReason, Layout, LayoutStatus, LayoutWarning,
        PlacedPlant, UnplacedPlant, UnplacedReason, ZonePlacement,
    },
    params::{OptimizationParams, ZoneBalancing},
    plant::{GrowthStage, Plant, Season},
    request::{
        CompatibilityApiResponse, CompatibilityRequest, CompatibilityResponse, ErrorResponse,
        FootprintApiResponse, FootprintRequest, FootprintResponse, GrowthStageEntry,
        GrowthStageListResponse, LayoutApiResponse, LayoutRequest, Link, Pagination, PlantFootprint,
        PlantPair,
    },
    Dimensions, Position,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Garden Layout API",
        description = "Assigns plants to garden zones under spacing, sunlight and companion-planting constraints, aiming for a target space utilization.",
        version = "0.1.0",
        license(name = "MIT"),
    ),
    paths(
        crate::api::handlers::layout::post_layout,
        crate::api::handlers::layout::delete_layout,
        crate::api::handlers::plants::list_growth_stages,
        crate::api::handlers::plants::post_footprint,
        crate::api::handlers::plants::post_compatibility,
    ),
    components(
        schemas(
            // Enums
            SunlightCondition, Season, GrowthStage, ZoneBalancing, UnplacedReason,
            ExclusionReason, LayoutStatus, LayoutWarning,
            // Garden and plants
            Position, Dimensions, Zone, Garden, Plant, OptimizationParams,
            // Layout
            PlacedPlant, ZonePlacement, Assignment, UnplacedPlant, ExcludedZone, Layout,
            // Requests and payloads
            LayoutRequest, FootprintRequest, PlantFootprint, FootprintResponse,
            CompatibilityRequest, PlantPair, CompatibilityResponse, GrowthStageEntry,
            // Shared
            Link, Pagination, ErrorResponse,
            // Concrete response envelopes (via #[aliases])
            LayoutApiResponse,
            FootprintApiResponse,
            CompatibilityApiResponse,
            GrowthStageListResponse,
        )
    ),
    tags(
        (name = "layout", description = "Compute and invalidate zone layouts"),
        (name = "plants", description = "Footprint and compatibility lookups"),
    )
)]
pub struct ApiDoc;

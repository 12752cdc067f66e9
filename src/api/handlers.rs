use actix_web::HttpResponse;

use crate::{error::OptimizationError, models::request::ErrorResponse};

pub mod layout;
pub mod plants;

pub use layout::{delete_layout, post_layout};
pub use plants::{list_growth_stages, post_compatibility, post_footprint};

/// Caller mistakes map to 400, everything else to 500.
pub(crate) fn error_response(err: &OptimizationError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    if err.is_input_error() {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

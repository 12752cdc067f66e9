use actix_web::web;

use crate::api::handlers::{
    delete_layout, list_growth_stages, post_compatibility, post_footprint, post_layout,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(post_layout)
            .service(delete_layout)
            .service(list_growth_stages)
            .service(post_footprint)
            .service(post_compatibility),
    );
}

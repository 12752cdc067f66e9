use actix_web::{test, web, App};
use garden_layout::{api::routes::configure, LayoutEngine};

fn build_app() -> actix_web::App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(LayoutEngine::default()))
        .configure(configure)
        .app_data(
            web::JsonConfig::default().error_handler(|err, _req| {
                let message = format!("{err}");
                actix_web::error::InternalError::from_response(
                    err,
                    actix_web::HttpResponse::BadRequest()
                        .json(serde_json::json!({ "error": message })),
                )
                .into()
            }),
        )
}

fn layout_payload() -> serde_json::Value {
    serde_json::json!({
        "garden": {
            "id": "g1",
            "totalArea": 100.0,
            "zones": [{ "id": "z1", "area": 100.0, "sunlightCondition": "FULL_SUN" }]
        },
        "plants": [
            { "id": "tomato", "type": "tomato", "spacingRequirement": 4.0, "sunlightNeeds": "FULL_SUN" },
            { "id": "lettuce", "type": "lettuce", "spacingRequirement": 1.0, "sunlightNeeds": "PARTIAL_SHADE" }
        ],
        "params": { "accessBuffer": 0.0 }
    })
}

// ---------------------------------------------------------------------------
// POST /api/layout
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_post_layout_returns_200() {
    let app = test::init_service(build_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .set_json(layout_payload())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_post_layout_places_both_plants() {
    let app = test::init_service(build_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .set_json(layout_payload())
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let payload = &body["payload"];
    assert_eq!(payload["status"], "SUCCEEDED");
    assert_eq!(payload["gardenId"], "g1");
    let zone = &payload["assignment"]["zones"][0];
    assert_eq!(zone["zoneId"], "z1");
    assert_eq!(zone["plants"].as_array().map(Vec::len), Some(2));
    let utilization = payload["spaceUtilization"].as_f64().unwrap();
    assert!((utilization - 5.0).abs() < 1e-9, "utilization = {utilization}");
    assert_eq!(payload["meetsTarget"], false);
    assert!(body.get("_links").is_some(), "Response must carry HAL links");
}

#[actix_web::test]
async fn test_post_layout_without_params_uses_defaults() {
    let app = test::init_service(build_app()).await;
    let mut payload = layout_payload();
    payload.as_object_mut().unwrap().remove("params");
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .set_json(&payload)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["payload"]["targetUtilization"], 92.0);
    assert_eq!(body["payload"]["status"], "SUCCEEDED");
}

#[actix_web::test]
async fn test_post_layout_reports_unplaced_plants() {
    let app = test::init_service(build_app()).await;
    let payload = serde_json::json!({
        "garden": {
            "id": "g2",
            "totalArea": 10.0,
            "zones": [{ "id": "shade", "area": 10.0, "sunlightCondition": "FULL_SHADE" }]
        },
        "plants": [
            { "id": "tomato", "type": "tomato", "spacingRequirement": 2.0, "sunlightNeeds": "FULL_SUN" }
        ]
    });
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .set_json(&payload)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["payload"]["status"], "PARTIAL");
    assert_eq!(body["payload"]["unplaced"][0]["plantId"], "tomato");
    assert_eq!(body["payload"]["unplaced"][0]["reason"], "noSunlightMatch");
    let errors = body["errors"].as_array().unwrap();
    assert!(!errors.is_empty(), "Partial layouts must explain themselves");
}

#[actix_web::test]
async fn test_post_layout_invalid_garden_returns_400() {
    let app = test::init_service(build_app()).await;
    let mut payload = layout_payload();
    payload["garden"]["totalArea"] = serde_json::json!(0.0);
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_post_layout_invalid_returns_error_message() {
    let app = test::init_service(build_app()).await;
    let mut payload = layout_payload();
    payload["garden"]["zones"] = serde_json::json!([]);
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .set_json(&payload)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let error_msg = body.get("error").and_then(|v| v.as_str()).unwrap_or("");
    assert!(!error_msg.is_empty(), "A readable error message must be returned");
}

#[actix_web::test]
async fn test_post_layout_malformed_json_returns_400() {
    let app = test::init_service(build_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .insert_header(("content-type", "application/json"))
        .set_payload("{invalid json}")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// DELETE /api/layout/{gardenId}
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_delete_layout_returns_204() {
    let app = test::init_service(build_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/layout")
        .set_json(layout_payload())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::delete().uri("/api/layout/g1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);
}

// ---------------------------------------------------------------------------
// GET /api/growth-stages
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_growth_stages_lists_every_stage() {
    let app = test::init_service(build_app()).await;
    let req = test::TestRequest::get().uri("/api/growth-stages").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let stages = body["payload"].as_array().unwrap();
    assert_eq!(stages.len(), 6);
    let seedling = stages.iter().find(|s| s["stage"] == "seedling").unwrap();
    assert_eq!(seedling["multiplier"], 0.3);
    assert_eq!(body["pagination"]["total"], 6);
}

// ---------------------------------------------------------------------------
// POST /api/plants/footprint
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_footprint_applies_stage_and_buffer() {
    let app = test::init_service(build_app()).await;
    let payload = serde_json::json!({
        "plants": [
            { "id": "t", "type": "tomato", "spacingRequirement": 4.0, "sunlightNeeds": "FULL_SUN", "growthStage": "seedling" }
        ],
        "params": { "accessBuffer": 0.5 }
    });
    let req = test::TestRequest::post()
        .uri("/api/plants/footprint")
        .set_json(&payload)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let footprint = &body["payload"]["footprints"][0];
    assert!((footprint["footprint"].as_f64().unwrap() - 1.7).abs() < 1e-9);
    assert!((footprint["matureFootprint"].as_f64().unwrap() - 4.5).abs() < 1e-9);
}

#[actix_web::test]
async fn test_footprint_rejects_zero_spacing() {
    let app = test::init_service(build_app()).await;
    let payload = serde_json::json!({
        "plants": [
            { "id": "t", "type": "tomato", "spacingRequirement": 0.0, "sunlightNeeds": "FULL_SUN" }
        ]
    });
    let req = test::TestRequest::post()
        .uri("/api/plants/footprint")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// POST /api/plants/compatibility
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_compatibility_reports_pairs() {
    let app = test::init_service(build_app()).await;
    let payload = serde_json::json!({
        "plants": [
            { "id": "t", "type": "tomato", "sunlightNeeds": "FULL_SUN", "companionPlants": ["basil"], "incompatiblePlants": ["fennel"] },
            { "id": "b", "type": "basil", "sunlightNeeds": "FULL_SUN" },
            { "id": "f", "type": "fennel", "sunlightNeeds": "FULL_SUN" }
        ]
    });
    let req = test::TestRequest::post()
        .uri("/api/plants/compatibility")
        .set_json(&payload)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let payload = &body["payload"];
    assert_eq!(payload["companions"].as_array().map(Vec::len), Some(1));
    assert_eq!(payload["incompatible"].as_array().map(Vec::len), Some(1));
    assert!(payload.get("sharedZoneScore").is_none());
}

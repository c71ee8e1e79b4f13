use actix_web::{test, web, App, HttpResponse};
use serde_json::json;

async fn health_check() -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({"status": "OK"})))
}

async fn get_properties() -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!([])))
}

async fn unauthorized() -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"})))
}

async fn not_found() -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::NotFound().json(json!({"error": "Not found"})))
}

fn test_app() -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/api")
                .route("/properties", web::get().to(get_properties))
                .route("/properties/{id}", web::get().to(not_found))
                .service(
                    web::scope("/account/{id}")
                        .route("/reservations", web::post().to(unauthorized))
                        .route("/kyc", web::get().to(unauthorized)),
                )
                .service(
                    web::scope("/payment")
                        .route("/reservations/{id}/intent", web::post().to(unauthorized))
                        .route("/reservations/{id}/verify", web::post().to(unauthorized)),
                ),
        )
}

#[actix_web::test]
async fn test_health_endpoint() {
    let app = test::init_service(test_app()).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_public_property_listing() {
    let app = test::init_service(test_app()).await;

    let req = test::TestRequest::get().uri("/api/properties").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_protected_routes_require_auth() {
    let app = test::init_service(test_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/account/abc/reservations")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/payment/reservations/xyz/verify")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_unknown_property_is_404() {
    let app = test::init_service(test_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/properties/does-not-exist")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

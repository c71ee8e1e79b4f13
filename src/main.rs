use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use propvest_api::db;
use propvest_api::middleware::auth::AuthMiddleware;
use propvest_api::middleware::role_auth::RequireRole;
use propvest_api::models::account::UserRole;
use propvest_api::routes;
use propvest_api::services::hedera::HederaService;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    println!("Logger initialized");

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        println!("Release mode");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    let mongo_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    println!("Got MongoDB URI, attempting connection...");
    let client = db::mongo::create_mongo_client(&mongo_uri).await;
    println!("MongoDB connection established");

    let stripe_secret =
        std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
    let stripe_client = Arc::new(stripe::Client::new(stripe_secret));

    let hedera = Arc::new(HederaService::new().expect("Hedera bridge configuration is missing"));

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/health", web::get().to(|| async { "OK" }))
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(stripe_client.clone()))
            .app_data(web::Data::new(hedera.clone()))
            .service(
                web::scope("/api")
                    .route("/status", web::get().to(routes::health::health_check))
                    // Public routes
                    .service(
                        web::scope("/auth")
                            .route("/signup", web::post().to(routes::account::signup))
                            .route("/signin", web::post().to(routes::account::signin))
                            .service(
                                web::scope("").wrap(AuthMiddleware).route(
                                    "/session",
                                    web::get().to(routes::account::user_session),
                                ),
                            ),
                    )
                    .service(
                        web::scope("/properties")
                            .route("", web::get().to(routes::property::get_properties))
                            .route("/{id}", web::get().to(routes::property::get_property))
                            .route(
                                "/{id}/blocked-dates",
                                web::get().to(routes::property::blocked_dates),
                            )
                            .route("/{id}/quote", web::post().to(routes::property::quote)),
                    )
                    .service(
                        web::scope("/governance")
                            .route("/groups", web::get().to(routes::governance::get_groups))
                            .route(
                                "/groups/{id}/polls",
                                web::get().to(routes::governance::get_polls),
                            )
                            .route(
                                "/polls/{id}/results",
                                web::get().to(routes::governance::poll_results),
                            )
                            // Protected routes
                            .service(
                                web::scope("")
                                    .wrap(AuthMiddleware)
                                    .route(
                                        "/groups/{id}/polls",
                                        web::post().to(routes::governance::create_poll),
                                    )
                                    .route(
                                        "/polls/{id}/votes",
                                        web::post().to(routes::governance::cast_vote),
                                    )
                                    .route(
                                        "/polls/{id}/close",
                                        web::put().to(routes::governance::close_poll),
                                    ),
                            ),
                    )
                    .service(
                        web::scope("/market")
                            .route(
                                "/properties/{id}/orders",
                                web::get().to(routes::market::get_open_orders),
                            )
                            .route(
                                "/properties/{id}/depth",
                                web::get().to(routes::market::order_book),
                            )
                            .route(
                                "/properties/{id}/market-quote",
                                web::post().to(routes::market::market_quote),
                            )
                            .service(
                                web::scope("")
                                    .wrap(AuthMiddleware)
                                    .route("/orders", web::post().to(routes::market::place_order))
                                    .route(
                                        "/orders/{id}",
                                        web::delete().to(routes::market::cancel_order),
                                    ),
                            ),
                    )
                    .service(
                        web::scope("/account/{id}")
                            .wrap(AuthMiddleware)
                            .route(
                                "/reservations",
                                web::post().to(routes::reservation::create_reservation),
                            )
                            .route(
                                "/reservations",
                                web::get().to(routes::reservation::get_user_reservations),
                            )
                            .route(
                                "/reservations/{reservation_id}",
                                web::get().to(routes::reservation::get_reservation),
                            )
                            .route(
                                "/reservations/{reservation_id}",
                                web::delete().to(routes::reservation::cancel_reservation),
                            )
                            .route("/kyc", web::post().to(routes::kyc::submit_document))
                            .route("/kyc", web::get().to(routes::kyc::get_kyc_status)),
                    )
                    .service(
                        web::scope("/payment")
                            .wrap(AuthMiddleware)
                            .route(
                                "/reservations/{id}/intent",
                                web::post().to(routes::payment::create_payment_intent),
                            )
                            .route(
                                "/reservations/{id}/verify",
                                web::post().to(routes::payment::verify_payment),
                            ),
                    )
                    .service(
                        web::scope("/tokens")
                            .wrap(AuthMiddleware)
                            .route("/account", web::post().to(routes::token::link_account))
                            .route("/associate", web::post().to(routes::token::associate_token))
                            .route("/holdings", web::get().to(routes::token::my_holdings))
                            .route(
                                "/{id}/balance",
                                web::get().to(routes::token::token_balance),
                            ),
                    )
                    .service(
                        web::scope("/admin")
                            .wrap(RequireRole::new(UserRole::Admin))
                            .wrap(AuthMiddleware)
                            .route(
                                "/properties",
                                web::post().to(routes::property::create_property),
                            )
                            .route("/kyc/pending", web::get().to(routes::kyc::pending_documents))
                            .route("/kyc/{id}", web::put().to(routes::kyc::review_document))
                            .route(
                                "/governance/groups",
                                web::post().to(routes::governance::create_group),
                            )
                            .route(
                                "/tokens/transfer",
                                web::post().to(routes::token::transfer_shares),
                            ),
                    ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}

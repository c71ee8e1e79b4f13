use actix_web::{web, HttpResponse, Responder};
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;
use std::{str::FromStr, sync::Arc};
use stripe::CapturePaymentIntent;

use crate::middleware::auth::Claims;
use crate::models::reservation::ReservationStatus;
use crate::services::reservation_service::reservations;

/// Reservations settle in the currencies the payment provider is enabled
/// for. Anything else is a configuration error surfaced to the caller.
fn settlement_currency(code: &str) -> Option<stripe::Currency> {
    match code.to_uppercase().as_str() {
        "USD" => Some(stripe::Currency::USD),
        "EUR" => Some(stripe::Currency::EUR),
        "GBP" => Some(stripe::Currency::GBP),
        "NGN" => Some(stripe::Currency::NGN),
        _ => None,
    }
}

/// Create (or return the already-created) manual-capture payment intent for
/// a pending reservation. The charge amount always comes from the stored
/// reservation total, never from the request.
pub async fn create_payment_intent(
    claims: Claims,
    mongodb_data: web::Data<Arc<Client>>,
    stripe_data: web::Data<Arc<stripe::Client>>,
    path: web::Path<String>,
) -> impl Responder {
    println!("Creating payment intent...");

    let client = mongodb_data.into_inner();
    let reservation_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid reservation ID format"),
    };

    let filter = doc! {
        "_id": reservation_id,
        "user_id": ObjectId::parse_str(&claims.user_id).unwrap(),
    };

    let reservation = match reservations(&client).find_one(filter.clone()).await {
        Ok(Some(reservation)) => reservation,
        Ok(None) => return HttpResponse::NotFound().body("Reservation not found"),
        Err(err) => {
            eprintln!("Error fetching reservation: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch reservation");
        }
    };

    // A retried request returns the intent minted the first time instead of
    // opening a second charge.
    if reservation.status == ReservationStatus::AwaitingPayment {
        if let Some(intent_id) = &reservation.payment_intent_id {
            return HttpResponse::Ok().json(serde_json::json!({
                "payment_intent_id": intent_id,
                "reused": true
            }));
        }
    }
    if reservation.status != ReservationStatus::Pending {
        return HttpResponse::BadRequest().body(format!(
            "Reservation is not payable in status {}",
            reservation.status.as_str()
        ));
    }

    let currency = match settlement_currency(&reservation.currency) {
        Some(currency) => currency,
        None => {
            return HttpResponse::BadRequest().body(format!(
                "Unsupported settlement currency: {}",
                reservation.currency
            ))
        }
    };

    let mut create_intent = stripe::CreatePaymentIntent::new(reservation.total_amount, currency);
    // Manual, as capture happens in the verification step
    create_intent.capture_method = Some(stripe::PaymentIntentCaptureMethod::Manual);
    let mut metadata = std::collections::HashMap::new();
    metadata.insert("reservation_id".to_string(), reservation_id.to_hex());
    metadata.insert("reference".to_string(), reservation.reference.clone());
    create_intent.metadata = Some(metadata);

    match stripe::PaymentIntent::create(stripe_data.as_ref(), create_intent).await {
        Ok(intent) => {
            let update = doc! {
                "$set": {
                    "status": ReservationStatus::AwaitingPayment.as_str(),
                    "payment_intent_id": intent.id.to_string(),
                    "updated_at": DateTime::now()
                }
            };

            match reservations(&client).update_one(filter, update).await {
                Ok(_) => HttpResponse::Ok().json(serde_json::json!({
                    "payment_intent_id": intent.id.to_string(),
                    "client_secret": intent.client_secret,
                    "amount": reservation.total_amount,
                    "currency": reservation.currency,
                })),
                Err(err) => {
                    eprintln!("Error attaching payment intent: {:?}", err);
                    HttpResponse::InternalServerError()
                        .body("Payment intent created but could not be attached to reservation")
                }
            }
        }
        Err(e) => {
            println!("Error creating payment intent: {:?}", e);
            HttpResponse::InternalServerError()
                .body(format!("Failed to create payment intent: {}", e))
        }
    }
}

/// Verify the payment of a reservation and confirm it. Safe to call again
/// after a timeout: an already-confirmed reservation short-circuits.
pub async fn verify_payment(
    claims: Claims,
    mongodb_data: web::Data<Arc<Client>>,
    stripe_data: web::Data<Arc<stripe::Client>>,
    path: web::Path<String>,
) -> impl Responder {
    println!("Verifying payment...");

    let client = mongodb_data.into_inner();
    let reservation_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid reservation ID format"),
    };

    let filter = doc! {
        "_id": reservation_id,
        "user_id": ObjectId::parse_str(&claims.user_id).unwrap(),
    };

    let reservation = match reservations(&client).find_one(filter.clone()).await {
        Ok(Some(reservation)) => reservation,
        Ok(None) => return HttpResponse::NotFound().body("Reservation not found"),
        Err(err) => {
            eprintln!("Error fetching reservation: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch reservation");
        }
    };

    if reservation.status == ReservationStatus::Confirmed {
        return HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "status": "confirmed",
            "already_confirmed": true
        }));
    }

    let payment_intent_id = match &reservation.payment_intent_id {
        Some(id) => id.clone(),
        None => return HttpResponse::BadRequest().body("Reservation has no payment intent"),
    };

    let intent = match stripe::PaymentIntent::retrieve(
        stripe_data.as_ref(),
        &stripe::PaymentIntentId::from_str(&payment_intent_id).expect("Invalid payment intent ID"),
        &[],
    )
    .await
    {
        Ok(intent) => intent,
        Err(e) => {
            println!("Error retrieving payment intent: {:?}", e);
            return HttpResponse::InternalServerError()
                .body(format!("Failed to retrieve payment intent: {}", e));
        }
    };

    let final_status = match intent.status {
        stripe::PaymentIntentStatus::Succeeded => stripe::PaymentIntentStatus::Succeeded,
        stripe::PaymentIntentStatus::RequiresCapture => {
            match stripe::PaymentIntent::capture(
                stripe_data.as_ref(),
                &payment_intent_id,
                CapturePaymentIntent::default(),
            )
            .await
            {
                Ok(captured) => captured.status,
                Err(capture_err) => {
                    println!("Error capturing payment: {:?}", capture_err);

                    let update = doc! {
                        "$set": {
                            "status": ReservationStatus::PaymentFailed.as_str(),
                            "updated_at": DateTime::now()
                        }
                    };
                    let _ = reservations(&client).update_one(filter, update).await;

                    return HttpResponse::InternalServerError().json(serde_json::json!({
                        "success": false,
                        "error": format!("Payment capture failed: {}", capture_err)
                    }));
                }
            }
        }
        other => {
            return HttpResponse::BadRequest().body(format!(
                "Payment is not in a verifiable state. Current status: {:?}",
                other
            ));
        }
    };

    let new_status = if final_status == stripe::PaymentIntentStatus::Succeeded {
        ReservationStatus::Confirmed
    } else {
        ReservationStatus::PaymentFailed
    };

    let update = doc! {
        "$set": {
            "status": new_status.as_str(),
            "updated_at": DateTime::now()
        }
    };

    match reservations(&client).update_one(filter, update).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": new_status == ReservationStatus::Confirmed,
            "status": new_status.as_str(),
        })),
        Err(err) => {
            eprintln!("Error updating reservation status: {:?}", err);
            // Payment went through; the status update is retryable.
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "warning": "Payment captured but reservation status update failed; retry verification",
            }))
        }
    }
}

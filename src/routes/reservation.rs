use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::auth::Claims;
use crate::models::reservation::{GuestCount, Reservation, ReservationStatus};
use crate::routes::property::listings;
use crate::services::availability_service::{AvailabilityError, AvailabilityService, DateRange};
use crate::services::pricing_service::PricingService;
use crate::services::reservation_service::{
    reservations, to_bson_date, ReservationError, ReservationService,
};

#[derive(Debug, Deserialize)]
pub struct ReservationInput {
    pub property_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: GuestCount,
}

pub async fn create_reservation(
    data: web::Data<Arc<Client>>,
    input: web::Json<ReservationInput>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    if path.into_inner() != claims.user_id {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let client = data.into_inner();
    let input = input.into_inner();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };
    let property_id = match ObjectId::parse_str(&input.property_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };

    let property = match listings(&client).find_one(doc! { "_id": property_id }).await {
        Ok(Some(property)) => property,
        Ok(None) => return HttpResponse::NotFound().body("Property not found"),
        Err(err) => {
            eprintln!("Error fetching property: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch property");
        }
    };

    if !property.active {
        return HttpResponse::BadRequest().body("Property is not accepting reservations");
    }

    let range = match DateRange::new(input.check_in, input.check_out) {
        Ok(range) => range,
        Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
    };

    // Advisory pre-check for a fast rejection; the transactional insert
    // below is what actually guarantees no double booking.
    let booked = match ReservationService::booked_ranges(&client, property_id).await {
        Ok(booked) => booked,
        Err(err) => {
            eprintln!("Error fetching booked ranges: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to check availability");
        }
    };
    let today = Utc::now().date_naive();
    if let Err(err) = AvailabilityService::check_available(&range, &booked, today) {
        return match err {
            AvailabilityError::DatesUnavailable => HttpResponse::Conflict().body(err.to_string()),
            _ => HttpResponse::BadRequest().body(err.to_string()),
        };
    }

    let breakdown =
        match PricingService::quote(&property.pricing, &range, &input.guests, property.max_guests)
        {
            Ok(breakdown) => breakdown,
            Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
        };

    let now = DateTime::now();
    let reservation = Reservation {
        id: None,
        property_id,
        user_id,
        status: ReservationStatus::Pending,
        check_in: to_bson_date(range.start()),
        check_out: to_bson_date(range.end()),
        guests: input.guests,
        price_lines: breakdown.lines,
        total_amount: breakdown.total_amount,
        currency: breakdown.currency,
        payment_intent_id: None,
        reference: Uuid::new_v4().to_string(),
        created_at: Some(now),
        updated_at: Some(now),
    };

    match ReservationService::create_blocking(&client, reservation).await {
        Ok(created) => HttpResponse::Ok().json(created),
        Err(ReservationError::DatesTaken) => {
            HttpResponse::Conflict().body("The selected dates were booked by another guest")
        }
        Err(ReservationError::Database(err)) => {
            eprintln!("Error creating reservation: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create reservation")
        }
    }
}

pub async fn get_user_reservations(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    if path.into_inner() != claims.user_id {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let client = data.into_inner();
    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    match reservations(&client).find(doc! { "user_id": user_id }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Reservation>>().await {
            Ok(results) => HttpResponse::Ok().json(results),
            Err(err) => {
                eprintln!("Error retrieving reservations: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve reservations")
            }
        },
        Err(err) => {
            eprintln!("Error fetching reservations: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch reservations")
        }
    }
}

pub async fn get_reservation(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String, String)>,
    claims: Claims,
) -> impl Responder {
    let (user_id, reservation_id) = path.into_inner();
    if user_id != claims.user_id {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let client = data.into_inner();
    let reservation_id = match ObjectId::parse_str(&reservation_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid reservation ID format"),
    };

    let filter = doc! {
        "_id": reservation_id,
        "user_id": ObjectId::parse_str(&claims.user_id).unwrap(),
    };

    match reservations(&client).find_one(filter).await {
        Ok(Some(reservation)) => HttpResponse::Ok().json(reservation),
        Ok(None) => HttpResponse::NotFound().body("Reservation not found"),
        Err(err) => {
            eprintln!("Error fetching reservation: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch reservation")
        }
    }
}

/// Cancelling releases the dates. Only reservations that have not been
/// paid for can be cancelled here; refunds are a support workflow.
pub async fn cancel_reservation(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String, String)>,
    claims: Claims,
) -> impl Responder {
    let (user_id, reservation_id) = path.into_inner();
    if user_id != claims.user_id {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let client = data.into_inner();
    let reservation_id = match ObjectId::parse_str(&reservation_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid reservation ID format"),
    };

    let cancellable = vec![
        ReservationStatus::Pending.as_str(),
        ReservationStatus::AwaitingPayment.as_str(),
    ];
    let filter = doc! {
        "_id": reservation_id,
        "user_id": ObjectId::parse_str(&claims.user_id).unwrap(),
        "status": { "$in": cancellable },
    };
    let update = doc! {
        "$set": {
            "status": ReservationStatus::Cancelled.as_str(),
            "updated_at": DateTime::now()
        }
    };

    match reservations(&client).update_one(filter, update).await {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::Conflict()
                    .body("Reservation not found or can no longer be cancelled");
            }
            HttpResponse::Ok().body("Reservation cancelled")
        }
        Err(err) => {
            eprintln!("Error cancelling reservation: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to cancel reservation")
        }
    }
}

use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::property::Property;
use crate::models::reservation::GuestCount;
use crate::services::availability_service::{AvailabilityError, AvailabilityService, DateRange};
use crate::services::pricing_service::PricingService;
use crate::services::reservation_service::ReservationService;

pub fn listings(client: &Client) -> mongodb::Collection<Property> {
    client.database("Properties").collection("Listings")
}

pub async fn get_properties(data: web::Data<Arc<Client>>) -> impl Responder {
    let client = data.into_inner();

    match listings(&client).find(doc! { "active": true }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Property>>().await {
            Ok(properties) => HttpResponse::Ok().json(properties),
            Err(err) => {
                eprintln!("Error collecting properties: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve properties")
            }
        },
        Err(err) => {
            eprintln!("Error fetching properties: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch properties")
        }
    }
}

pub async fn get_property(data: web::Data<Arc<Client>>, path: web::Path<String>) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };

    match listings(&client).find_one(doc! { "_id": property_id }).await {
        Ok(Some(property)) => HttpResponse::Ok().json(property),
        Ok(None) => HttpResponse::NotFound().body("Property not found"),
        Err(err) => {
            eprintln!("Error fetching property: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch property")
        }
    }
}

pub async fn create_property(
    data: web::Data<Arc<Client>>,
    claims: Claims,
    input: web::Json<Property>,
) -> impl Responder {
    let client = data.into_inner();

    let mut property = input.into_inner();

    if property.pricing.amount <= 0 {
        return HttpResponse::BadRequest().body("Listing rate must be positive");
    }
    if property.total_shares <= 0 {
        return HttpResponse::BadRequest().body("Total shares must be positive");
    }
    if property.max_guests == 0 {
        return HttpResponse::BadRequest().body("Property must sleep at least one guest");
    }

    let now = DateTime::now();
    property.id = None;
    property.pricing.currency = property.pricing.currency.to_uppercase();
    property.created_by = ObjectId::parse_str(&claims.user_id).ok();
    property.created_at = Some(now);
    property.updated_at = Some(now);

    match listings(&client).insert_one(&property).await {
        Ok(result) => HttpResponse::Ok().json(serde_json::json!({
            "property_id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
        })),
        Err(err) => {
            eprintln!("Error creating property: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create property")
        }
    }
}

/// Calendar days the date picker must disable, derived from every
/// reservation currently holding dates.
pub async fn blocked_dates(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };

    match ReservationService::booked_ranges(&client, property_id).await {
        Ok(ranges) => HttpResponse::Ok().json(AvailabilityService::blocked_dates(&ranges)),
        Err(err) => {
            eprintln!("Error fetching booked ranges: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch booked dates")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteInput {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: GuestCount,
}

/// Price a stay without reserving it. The same validation and arithmetic
/// run again when the reservation is created.
pub async fn quote(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    input: web::Json<QuoteInput>,
) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(path.into_inner()) {
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

    let input = input.into_inner();
    let range = match DateRange::new(input.check_in, input.check_out) {
        Ok(range) => range,
        Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
    };

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

    match PricingService::quote(&property.pricing, &range, &input.guests, property.max_guests) {
        Ok(breakdown) => HttpResponse::Ok().json(breakdown),
        Err(err) => HttpResponse::BadRequest().body(err.to_string()),
    }
}

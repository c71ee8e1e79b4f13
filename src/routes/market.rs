use actix_web::{web, HttpResponse, Responder};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::market::{Holding, OrderSide, OrderStatus, ShareOrder};
use crate::routes::kyc::is_approved;
use crate::routes::property::listings;
use crate::services::market_depth_service::{DepthError, MarketDepthService};

pub fn orders(client: &Client) -> mongodb::Collection<ShareOrder> {
    client.database("Market").collection("Orders")
}

pub fn holdings(client: &Client) -> mongodb::Collection<Holding> {
    client.database("Market").collection("Holdings")
}

/// Shares of one property currently held by a user; zero when no holding
/// record exists.
pub async fn share_balance(
    client: &Client,
    user_id: ObjectId,
    property_id: ObjectId,
) -> Result<i64, mongodb::error::Error> {
    let filter = doc! { "user_id": user_id, "property_id": property_id };
    Ok(holdings(client)
        .find_one(filter)
        .await?
        .map(|h| h.shares)
        .unwrap_or(0))
}

async fn open_orders_for(
    client: &Client,
    property_id: ObjectId,
) -> Result<Vec<ShareOrder>, mongodb::error::Error> {
    let filter = doc! { "property_id": property_id, "status": "open" };
    let cursor = orders(client).find(filter).await?;
    cursor.try_collect().await
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderInput {
    pub property_id: String,
    pub side: OrderSide,
    pub price: i64,
    pub quantity: i64,
}

pub async fn place_order(
    data: web::Data<Arc<Client>>,
    input: web::Json<PlaceOrderInput>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    if input.price <= 0 {
        return HttpResponse::BadRequest().body("Order price must be positive");
    }
    if input.quantity <= 0 {
        return HttpResponse::BadRequest().body("Order quantity must be positive");
    }

    let property_id = match ObjectId::parse_str(&input.property_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };
    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();

    match is_approved(&client, user_id).await {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::Forbidden().body("Identity verification required to trade");
        }
        Err(err) => {
            eprintln!("Error checking verification: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to check verification");
        }
    }

    let property = match listings(&client).find_one(doc! { "_id": property_id }).await {
        Ok(Some(property)) => property,
        Ok(None) => return HttpResponse::NotFound().body("Property not found"),
        Err(err) => {
            eprintln!("Error fetching property: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch property");
        }
    };

    if input.side == OrderSide::Sell {
        let held = match share_balance(&client, user_id, property_id).await {
            Ok(held) => held,
            Err(err) => {
                eprintln!("Error checking holdings: {:?}", err);
                return HttpResponse::InternalServerError().body("Failed to check holdings");
            }
        };
        if held < input.quantity {
            return HttpResponse::BadRequest().body(format!(
                "Insufficient shares: holding {}, offering {}",
                held, input.quantity
            ));
        }
    }

    let now = DateTime::now();
    let order = ShareOrder {
        id: None,
        property_id,
        user_id,
        side: input.side,
        price: input.price,
        quantity: input.quantity,
        currency: property.pricing.currency.clone(),
        status: OrderStatus::Open,
        created_at: Some(now),
        updated_at: Some(now),
    };

    match orders(&client).insert_one(&order).await {
        Ok(result) => HttpResponse::Ok().json(serde_json::json!({
            "order_id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
        })),
        Err(err) => {
            eprintln!("Error placing order: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to place order")
        }
    }
}

pub async fn get_open_orders(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };

    match open_orders_for(&client, property_id).await {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(err) => {
            eprintln!("Error fetching orders: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch orders")
        }
    }
}

pub async fn cancel_order(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();

    let order_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid order ID format"),
    };

    let filter = doc! {
        "_id": order_id,
        "user_id": ObjectId::parse_str(&claims.user_id).unwrap(),
        "status": "open",
    };
    let update = doc! {
        "$set": {
            "status": "cancelled",
            "updated_at": DateTime::now(),
        }
    };

    match orders(&client).update_one(filter, update).await {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::NotFound().body("No open order with that ID");
            }
            HttpResponse::Ok().body("Order cancelled")
        }
        Err(err) => {
            eprintln!("Error cancelling order: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to cancel order")
        }
    }
}

/// Display-ready depth table for a property's order book.
pub async fn order_book(data: web::Data<Arc<Client>>, path: web::Path<String>) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };

    match open_orders_for(&client, property_id).await {
        Ok(open) => HttpResponse::Ok().json(MarketDepthService::depth_table(&open)),
        Err(err) => {
            eprintln!("Error fetching orders: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch orders")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarketQuoteInput {
    pub side: OrderSide,
    pub quantity: i64,
}

/// Estimate the fill of a market order against the current book. Display
/// guidance only; no order is placed.
pub async fn market_quote(
    data: web::Data<Arc<Client>>,
    input: web::Json<MarketQuoteInput>,
    path: web::Path<String>,
) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };

    let open = match open_orders_for(&client, property_id).await {
        Ok(open) => open,
        Err(err) => {
            eprintln!("Error fetching orders: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch orders");
        }
    };

    match MarketDepthService::estimate_market_order(input.side, input.quantity, &open) {
        Ok(estimate) => HttpResponse::Ok().json(estimate),
        Err(DepthError::InvalidQuantity) => {
            HttpResponse::BadRequest().body(DepthError::InvalidQuantity.to_string())
        }
        Err(DepthError::NoLiquidity) => {
            HttpResponse::Conflict().body(DepthError::NoLiquidity.to_string())
        }
    }
}

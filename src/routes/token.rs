use actix_web::{web, HttpResponse, Responder};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::account::User;
use crate::models::market::Holding;
use crate::models::token::{TokenOperation, TokenTransaction, TokenTransactionStatus};
use crate::routes::kyc::is_approved;
use crate::routes::market::holdings;
use crate::routes::property::listings;
use crate::services::hedera::{HederaError, HederaService};

fn token_transactions(client: &Client) -> mongodb::Collection<TokenTransaction> {
    client.database("Tokens").collection("Transactions")
}

fn users(client: &Client) -> mongodb::Collection<User> {
    client.database("Account").collection("Users")
}

async fn load_user(client: &Client, user_id: ObjectId) -> Result<Option<User>, mongodb::error::Error> {
    users(client).find_one(doc! { "_id": user_id }).await
}

#[derive(Debug, Deserialize)]
pub struct LinkAccountInput {
    pub hedera_account_id: String,
}

/// Record the Hedera account a user wants their shares held against.
pub async fn link_account(
    data: web::Data<Arc<Client>>,
    input: web::Json<LinkAccountInput>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    // Shaped like "0.0.12345"
    if input.hedera_account_id.split('.').count() != 3
        || input
            .hedera_account_id
            .split('.')
            .any(|part| part.is_empty() || part.chars().any(|c| !c.is_ascii_digit()))
    {
        return HttpResponse::BadRequest().body("Invalid Hedera account ID format");
    }

    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();
    let update = doc! {
        "$set": {
            "hedera_account_id": &input.hedera_account_id,
            "updated_at": DateTime::now(),
        }
    };

    match users(&client).update_one(doc! { "_id": user_id }, update).await {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::NotFound().body("User not found");
            }
            HttpResponse::Ok().json(serde_json::json!({
                "hedera_account_id": input.hedera_account_id,
            }))
        }
        Err(err) => {
            eprintln!("Error linking account: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to link account")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssociateInput {
    pub property_id: String,
}

/// Associate the caller's linked Hedera account with a property's share
/// token via the custodial bridge.
pub async fn associate_token(
    data: web::Data<Arc<Client>>,
    hedera: web::Data<Arc<HederaService>>,
    input: web::Json<AssociateInput>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(&input.property_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };
    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();

    let property = match listings(&client).find_one(doc! { "_id": property_id }).await {
        Ok(Some(property)) => property,
        Ok(None) => return HttpResponse::NotFound().body("Property not found"),
        Err(err) => {
            eprintln!("Error fetching property: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch property");
        }
    };
    let token_id = match &property.token_id {
        Some(token_id) => token_id.clone(),
        None => return HttpResponse::BadRequest().body("Property has not been tokenized"),
    };

    let account_id = match load_user(&client, user_id).await {
        Ok(Some(user)) => match user.hedera_account_id {
            Some(account_id) => account_id,
            None => return HttpResponse::BadRequest().body("No Hedera account linked"),
        },
        Ok(None) => return HttpResponse::NotFound().body("User not found"),
        Err(err) => {
            eprintln!("Error fetching user: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch user");
        }
    };

    let mut record = TokenTransaction {
        id: None,
        operation: TokenOperation::Associate,
        token_id: token_id.clone(),
        account_id: account_id.clone(),
        counterparty: None,
        amount: None,
        initiated_by: Some(user_id),
        bridge_tx_id: None,
        status: TokenTransactionStatus::Submitted,
        error: None,
        created_at: Some(DateTime::now()),
    };

    match hedera.associate_token(&account_id, &token_id).await {
        Ok(receipt) => {
            record.bridge_tx_id = Some(receipt.transaction_id.clone());
            record.status = TokenTransactionStatus::Success;
            if let Err(err) = token_transactions(&client).insert_one(&record).await {
                eprintln!("Error recording token transaction: {:?}", err);
            }
            HttpResponse::Ok().json(serde_json::json!({
                "transaction_id": receipt.transaction_id,
                "status": receipt.status,
            }))
        }
        Err(err) => {
            eprintln!("Error associating token: {}", err);
            record.status = TokenTransactionStatus::Failed;
            record.error = Some(err.to_string());
            if let Err(record_err) = token_transactions(&client).insert_one(&record).await {
                eprintln!("Error recording token transaction: {:?}", record_err);
            }
            HttpResponse::BadGateway().body(format!("Token association failed: {}", err))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub property_id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: i64,
}

/// Custodial movement of share tokens between two verified users, with the
/// off-ledger holdings mirror updated on success. Admin only; settlement
/// of matched orders arrives through this endpoint.
pub async fn transfer_shares(
    data: web::Data<Arc<Client>>,
    hedera: web::Data<Arc<HederaService>>,
    input: web::Json<TransferInput>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    if input.amount <= 0 {
        return HttpResponse::BadRequest().body("Transfer amount must be positive");
    }

    let property_id = match ObjectId::parse_str(&input.property_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };
    let from_user_id = match ObjectId::parse_str(&input.from_user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid sender user ID"),
    };
    let to_user_id = match ObjectId::parse_str(&input.to_user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid recipient user ID"),
    };

    match is_approved(&client, to_user_id).await {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::Forbidden().body("Recipient has not completed verification");
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
    let token_id = match &property.token_id {
        Some(token_id) => token_id.clone(),
        None => return HttpResponse::BadRequest().body("Property has not been tokenized"),
    };

    let from_account = match load_user(&client, from_user_id).await {
        Ok(Some(user)) => match user.hedera_account_id {
            Some(account) => account,
            None => return HttpResponse::BadRequest().body("Sender has no Hedera account linked"),
        },
        Ok(None) => return HttpResponse::NotFound().body("Sender not found"),
        Err(err) => {
            eprintln!("Error fetching sender: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch sender");
        }
    };
    let to_account = match load_user(&client, to_user_id).await {
        Ok(Some(user)) => match user.hedera_account_id {
            Some(account) => account,
            None => {
                return HttpResponse::BadRequest().body("Recipient has no Hedera account linked")
            }
        },
        Ok(None) => return HttpResponse::NotFound().body("Recipient not found"),
        Err(err) => {
            eprintln!("Error fetching recipient: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch recipient");
        }
    };

    let held = match crate::routes::market::share_balance(&client, from_user_id, property_id).await
    {
        Ok(held) => held,
        Err(err) => {
            eprintln!("Error checking holdings: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to check holdings");
        }
    };
    if held < input.amount {
        return HttpResponse::BadRequest().body(format!(
            "Insufficient shares: holding {}, transferring {}",
            held, input.amount
        ));
    }

    let mut record = TokenTransaction {
        id: None,
        operation: TokenOperation::Transfer,
        token_id: token_id.clone(),
        account_id: from_account.clone(),
        counterparty: Some(to_account.clone()),
        amount: Some(input.amount),
        initiated_by: ObjectId::parse_str(&claims.user_id).ok(),
        bridge_tx_id: None,
        status: TokenTransactionStatus::Submitted,
        error: None,
        created_at: Some(DateTime::now()),
    };

    match hedera
        .transfer_token(&token_id, &from_account, &to_account, input.amount)
        .await
    {
        Ok(receipt) => {
            let now = DateTime::now();
            let debit = doc! { "$inc": { "shares": -input.amount }, "$set": { "updated_at": now } };
            let credit = doc! { "$inc": { "shares": input.amount }, "$set": { "updated_at": now } };

            if let Err(err) = holdings(&client)
                .update_one(
                    doc! { "user_id": from_user_id, "property_id": property_id },
                    debit,
                )
                .await
            {
                eprintln!("Error debiting holdings: {:?}", err);
            }
            if let Err(err) = holdings(&client)
                .update_one(
                    doc! { "user_id": to_user_id, "property_id": property_id },
                    credit,
                )
                .upsert(true)
                .await
            {
                eprintln!("Error crediting holdings: {:?}", err);
            }

            record.bridge_tx_id = Some(receipt.transaction_id.clone());
            record.status = TokenTransactionStatus::Success;
            if let Err(err) = token_transactions(&client).insert_one(&record).await {
                eprintln!("Error recording token transaction: {:?}", err);
            }

            HttpResponse::Ok().json(serde_json::json!({
                "transaction_id": receipt.transaction_id,
                "status": receipt.status,
                "amount": input.amount,
            }))
        }
        Err(err) => {
            eprintln!("Error transferring token: {}", err);
            record.status = TokenTransactionStatus::Failed;
            record.error = Some(err.to_string());
            if let Err(record_err) = token_transactions(&client).insert_one(&record).await {
                eprintln!("Error recording token transaction: {:?}", record_err);
            }
            HttpResponse::BadGateway().body(format!("Token transfer failed: {}", err))
        }
    }
}

pub async fn my_holdings(data: web::Data<Arc<Client>>, claims: Claims) -> impl Responder {
    let client = data.into_inner();
    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();

    match holdings(&client).find(doc! { "user_id": user_id }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Holding>>().await {
            Ok(results) => HttpResponse::Ok().json(results),
            Err(err) => {
                eprintln!("Error retrieving holdings: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve holdings")
            }
        },
        Err(err) => {
            eprintln!("Error fetching holdings: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch holdings")
        }
    }
}

/// On-ledger balance of the caller's linked account for a property token,
/// straight from the mirror node.
pub async fn token_balance(
    data: web::Data<Arc<Client>>,
    hedera: web::Data<Arc<HederaService>>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();

    let property_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };
    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();

    let property = match listings(&client).find_one(doc! { "_id": property_id }).await {
        Ok(Some(property)) => property,
        Ok(None) => return HttpResponse::NotFound().body("Property not found"),
        Err(err) => {
            eprintln!("Error fetching property: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch property");
        }
    };
    let token_id = match &property.token_id {
        Some(token_id) => token_id.clone(),
        None => return HttpResponse::BadRequest().body("Property has not been tokenized"),
    };

    let account_id = match load_user(&client, user_id).await {
        Ok(Some(user)) => match user.hedera_account_id {
            Some(account) => account,
            None => return HttpResponse::BadRequest().body("No Hedera account linked"),
        },
        Ok(None) => return HttpResponse::NotFound().body("User not found"),
        Err(err) => {
            eprintln!("Error fetching user: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch user");
        }
    };

    match hedera.token_balance(&token_id, &account_id).await {
        Ok(balance) => HttpResponse::Ok().json(serde_json::json!({
            "token_id": token_id,
            "account_id": account_id,
            "balance": balance,
        })),
        Err(HederaError::AccountNotFound) => HttpResponse::Ok().json(serde_json::json!({
            "token_id": token_id,
            "account_id": account_id,
            "balance": 0,
        })),
        Err(err) => {
            eprintln!("Error fetching balance: {}", err);
            HttpResponse::BadGateway().body(format!("Failed to fetch balance: {}", err))
        }
    }
}

use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::governance::{InvestmentGroup, Poll, PollStatus, Vote};
use crate::routes::market::share_balance;
use crate::routes::property::listings;

fn groups(client: &Client) -> mongodb::Collection<InvestmentGroup> {
    client.database("Governance").collection("Groups")
}

fn polls(client: &Client) -> mongodb::Collection<Poll> {
    client.database("Governance").collection("Polls")
}

fn votes(client: &Client) -> mongodb::Collection<Vote> {
    client.database("Governance").collection("Votes")
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupInput {
    pub property_id: String,
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_group(
    data: web::Data<Arc<Client>>,
    input: web::Json<CreateGroupInput>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    if input.name.trim().is_empty() {
        return HttpResponse::BadRequest().body("Group name is required");
    }

    let property_id = match ObjectId::parse_str(&input.property_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid property ID format"),
    };

    match listings(&client).find_one(doc! { "_id": property_id }).await {
        Ok(Some(_)) => {}
        Ok(None) => return HttpResponse::NotFound().body("Property not found"),
        Err(err) => {
            eprintln!("Error fetching property: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch property");
        }
    }

    let now = DateTime::now();
    let group = InvestmentGroup {
        id: None,
        property_id,
        name: input.name,
        description: input.description,
        created_by: ObjectId::parse_str(&claims.user_id).ok(),
        created_at: Some(now),
        updated_at: Some(now),
    };

    match groups(&client).insert_one(&group).await {
        Ok(result) => HttpResponse::Ok().json(serde_json::json!({
            "group_id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
        })),
        Err(err) => {
            eprintln!("Error creating group: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create group")
        }
    }
}

pub async fn get_groups(data: web::Data<Arc<Client>>) -> impl Responder {
    let client = data.into_inner();

    match groups(&client).find(doc! {}).await {
        Ok(cursor) => match cursor.try_collect::<Vec<InvestmentGroup>>().await {
            Ok(results) => HttpResponse::Ok().json(results),
            Err(err) => {
                eprintln!("Error retrieving groups: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve groups")
            }
        },
        Err(err) => {
            eprintln!("Error fetching groups: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch groups")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePollInput {
    pub question: String,
    pub options: Vec<String>,
    pub closes_at: chrono::DateTime<Utc>,
}

pub async fn create_poll(
    data: web::Data<Arc<Client>>,
    input: web::Json<CreatePollInput>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    let group_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid group ID format"),
    };

    if input.question.trim().is_empty() {
        return HttpResponse::BadRequest().body("Poll question is required");
    }
    if input.options.len() < 2 {
        return HttpResponse::BadRequest().body("A poll needs at least two options");
    }
    if input.closes_at <= Utc::now() {
        return HttpResponse::BadRequest().body("Poll closing time must be in the future");
    }

    let group = match groups(&client).find_one(doc! { "_id": group_id }).await {
        Ok(Some(group)) => group,
        Ok(None) => return HttpResponse::NotFound().body("Group not found"),
        Err(err) => {
            eprintln!("Error fetching group: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch group");
        }
    };

    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();
    let is_admin = claims.role.as_deref() == Some("admin");
    if !is_admin {
        match share_balance(&client, user_id, group.property_id).await {
            Ok(shares) if shares > 0 => {}
            Ok(_) => {
                return HttpResponse::Forbidden().body("Only shareholders can open polls");
            }
            Err(err) => {
                eprintln!("Error checking holdings: {:?}", err);
                return HttpResponse::InternalServerError().body("Failed to check holdings");
            }
        }
    }

    let now = DateTime::now();
    let poll = Poll {
        id: None,
        group_id,
        question: input.question,
        options: input.options,
        status: PollStatus::Open,
        closes_at: DateTime::from_chrono(input.closes_at),
        created_by: user_id,
        created_at: Some(now),
        updated_at: Some(now),
    };

    match polls(&client).insert_one(&poll).await {
        Ok(result) => HttpResponse::Ok().json(serde_json::json!({
            "poll_id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
        })),
        Err(err) => {
            eprintln!("Error creating poll: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create poll")
        }
    }
}

pub async fn get_polls(data: web::Data<Arc<Client>>, path: web::Path<String>) -> impl Responder {
    let client = data.into_inner();

    let group_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid group ID format"),
    };

    match polls(&client).find(doc! { "group_id": group_id }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Poll>>().await {
            Ok(results) => HttpResponse::Ok().json(results),
            Err(err) => {
                eprintln!("Error retrieving polls: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve polls")
            }
        },
        Err(err) => {
            eprintln!("Error fetching polls: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch polls")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CastVoteInput {
    pub option_index: u32,
}

/// Cast (or replace) a share-weighted ballot. Weight is the voter's share
/// count at cast time.
pub async fn cast_vote(
    data: web::Data<Arc<Client>>,
    input: web::Json<CastVoteInput>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();

    let poll_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid poll ID format"),
    };

    let poll = match polls(&client).find_one(doc! { "_id": poll_id }).await {
        Ok(Some(poll)) => poll,
        Ok(None) => return HttpResponse::NotFound().body("Poll not found"),
        Err(err) => {
            eprintln!("Error fetching poll: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch poll");
        }
    };

    if poll.status != PollStatus::Open || poll.closes_at.to_chrono() <= Utc::now() {
        return HttpResponse::Conflict().body("Poll is closed");
    }

    let option_index = input.option_index;
    if option_index as usize >= poll.options.len() {
        return HttpResponse::BadRequest().body("Option index out of range");
    }

    let group = match groups(&client).find_one(doc! { "_id": poll.group_id }).await {
        Ok(Some(group)) => group,
        Ok(None) => return HttpResponse::NotFound().body("Group not found"),
        Err(err) => {
            eprintln!("Error fetching group: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch group");
        }
    };

    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();
    let weight = match share_balance(&client, user_id, group.property_id).await {
        Ok(shares) => shares,
        Err(err) => {
            eprintln!("Error checking holdings: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to check holdings");
        }
    };
    if weight <= 0 {
        return HttpResponse::Forbidden().body("Only shareholders can vote");
    }

    let filter = doc! { "poll_id": poll_id, "user_id": user_id };
    let update = doc! {
        "$set": {
            "option_index": option_index as i64,
            "weight": weight,
            "updated_at": DateTime::now(),
        },
        "$setOnInsert": {
            "created_at": DateTime::now(),
        }
    };

    match votes(&client).update_one(filter, update).upsert(true).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "poll_id": poll_id.to_hex(),
            "option_index": option_index,
            "weight": weight,
        })),
        Err(err) => {
            eprintln!("Error casting vote: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to cast vote")
        }
    }
}

pub async fn poll_results(data: web::Data<Arc<Client>>, path: web::Path<String>) -> impl Responder {
    let client = data.into_inner();

    let poll_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid poll ID format"),
    };

    let poll = match polls(&client).find_one(doc! { "_id": poll_id }).await {
        Ok(Some(poll)) => poll,
        Ok(None) => return HttpResponse::NotFound().body("Poll not found"),
        Err(err) => {
            eprintln!("Error fetching poll: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch poll");
        }
    };

    let ballots = match votes(&client).find(doc! { "poll_id": poll_id }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Vote>>().await {
            Ok(ballots) => ballots,
            Err(err) => {
                eprintln!("Error retrieving votes: {:?}", err);
                return HttpResponse::InternalServerError().body("Failed to retrieve votes");
            }
        },
        Err(err) => {
            eprintln!("Error fetching votes: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch votes");
        }
    };

    let tallies = tally_votes(poll.options.len(), &ballots);
    let total_weight: i64 = tallies.iter().map(|t| t.0).sum();

    let options: Vec<serde_json::Value> = poll
        .options
        .iter()
        .zip(tallies.iter())
        .map(|(option, (weight, count))| {
            serde_json::json!({
                "option": option,
                "weight": weight,
                "votes": count,
            })
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "poll_id": poll_id.to_hex(),
        "question": poll.question,
        "status": poll.status,
        "options": options,
        "total_weight": total_weight,
        "total_votes": ballots.len(),
    }))
}

pub async fn close_poll(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();

    let poll_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid poll ID format"),
    };

    let poll = match polls(&client).find_one(doc! { "_id": poll_id }).await {
        Ok(Some(poll)) => poll,
        Ok(None) => return HttpResponse::NotFound().body("Poll not found"),
        Err(err) => {
            eprintln!("Error fetching poll: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to fetch poll");
        }
    };

    let is_admin = claims.role.as_deref() == Some("admin");
    if !is_admin && poll.created_by.to_hex() != claims.user_id {
        return HttpResponse::Forbidden().body("Only the poll creator can close it");
    }

    let update = doc! {
        "$set": {
            "status": "closed",
            "updated_at": DateTime::now(),
        }
    };

    match polls(&client).update_one(doc! { "_id": poll_id }, update).await {
        Ok(_) => HttpResponse::Ok().body("Poll closed"),
        Err(err) => {
            eprintln!("Error closing poll: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to close poll")
        }
    }
}

/// Per-option (weight, ballot count). Ballots pointing at a removed option
/// index are ignored rather than failing the whole tally.
fn tally_votes(option_count: usize, ballots: &[Vote]) -> Vec<(i64, u64)> {
    let mut tallies = vec![(0i64, 0u64); option_count];
    for ballot in ballots {
        if let Some(tally) = tallies.get_mut(ballot.option_index as usize) {
            tally.0 += ballot.weight;
            tally.1 += 1;
        }
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(option_index: u32, weight: i64) -> Vote {
        Vote {
            id: None,
            poll_id: ObjectId::new(),
            user_id: ObjectId::new(),
            option_index,
            weight,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn tally_sums_weights_per_option() {
        let ballots = vec![ballot(0, 100), ballot(1, 50), ballot(0, 25)];
        let tallies = tally_votes(2, &ballots);
        assert_eq!(tallies, vec![(125, 2), (50, 1)]);
    }

    #[test]
    fn tally_total_weight_matches_ballots() {
        let ballots = vec![ballot(0, 10), ballot(1, 20), ballot(2, 30)];
        let tallies = tally_votes(3, &ballots);
        let total: i64 = tallies.iter().map(|t| t.0).sum();
        assert_eq!(total, 60);
    }

    #[test]
    fn tally_ignores_out_of_range_ballots() {
        let ballots = vec![ballot(0, 10), ballot(9, 99)];
        let tallies = tally_votes(2, &ballots);
        assert_eq!(tallies, vec![(10, 1), (0, 0)]);
    }
}

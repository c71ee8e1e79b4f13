use actix_web::{web, HttpResponse, Responder};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::kyc::{KycDocument, KycDocumentType, KycStatus};

pub fn kyc_documents(client: &Client) -> mongodb::Collection<KycDocument> {
    client.database("Compliance").collection("KycDocuments")
}

/// Whether the user has at least one approved identity document. Gate for
/// marketplace orders and share transfers.
pub async fn is_approved(
    client: &Client,
    user_id: ObjectId,
) -> Result<bool, mongodb::error::Error> {
    let filter = doc! {
        "user_id": user_id,
        "status": KycStatus::Approved.as_str(),
    };
    Ok(kyc_documents(client).find_one(filter).await?.is_some())
}

fn overall_status(documents: &[KycDocument]) -> &'static str {
    if documents.iter().any(|d| d.status == KycStatus::Approved) {
        "approved"
    } else if documents.iter().any(|d| d.status == KycStatus::Pending) {
        "pending"
    } else if documents.iter().any(|d| d.status == KycStatus::Rejected) {
        "rejected"
    } else {
        "unverified"
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitDocumentInput {
    pub doc_type: KycDocumentType,
    /// Pointer into the document store; the upload happened out of band.
    pub storage_ref: String,
}

pub async fn submit_document(
    data: web::Data<Arc<Client>>,
    input: web::Json<SubmitDocumentInput>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    if path.into_inner() != claims.user_id {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let client = data.into_inner();
    let input = input.into_inner();

    if input.storage_ref.trim().is_empty() {
        return HttpResponse::BadRequest().body("Missing document reference");
    }

    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();
    let collection = kyc_documents(&client);

    // One live document per type: re-submission is only allowed after a
    // rejection.
    let live_filter = doc! {
        "user_id": user_id,
        "doc_type": input.doc_type.as_str(),
        "status": { "$in": [KycStatus::Pending.as_str(), KycStatus::Approved.as_str()] },
    };

    match collection.find_one(live_filter).await {
        Ok(Some(existing)) => {
            return HttpResponse::Conflict().body(format!(
                "A document of this type is already {}",
                existing.status.as_str()
            ));
        }
        Ok(None) => {}
        Err(err) => {
            eprintln!("Error checking existing documents: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to check existing documents");
        }
    }

    let document = KycDocument {
        id: None,
        user_id,
        doc_type: input.doc_type,
        storage_ref: input.storage_ref,
        status: KycStatus::Pending,
        rejection_reason: None,
        reviewed_by: None,
        submitted_at: Some(DateTime::now()),
        reviewed_at: None,
    };

    match collection.insert_one(&document).await {
        Ok(result) => HttpResponse::Ok().json(serde_json::json!({
            "document_id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
            "status": "pending"
        })),
        Err(err) => {
            eprintln!("Error submitting document: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to submit document")
        }
    }
}

pub async fn get_kyc_status(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    if path.into_inner() != claims.user_id {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let client = data.into_inner();
    let user_id = ObjectId::parse_str(&claims.user_id).unwrap();

    match kyc_documents(&client).find(doc! { "user_id": user_id }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<KycDocument>>().await {
            Ok(documents) => HttpResponse::Ok().json(serde_json::json!({
                "status": overall_status(&documents),
                "documents": documents,
            })),
            Err(err) => {
                eprintln!("Error retrieving documents: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve documents")
            }
        },
        Err(err) => {
            eprintln!("Error fetching documents: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch documents")
        }
    }
}

pub async fn pending_documents(data: web::Data<Arc<Client>>) -> impl Responder {
    let client = data.into_inner();

    match kyc_documents(&client)
        .find(doc! { "status": KycStatus::Pending.as_str() })
        .await
    {
        Ok(cursor) => match cursor.try_collect::<Vec<KycDocument>>().await {
            Ok(documents) => HttpResponse::Ok().json(documents),
            Err(err) => {
                eprintln!("Error retrieving review queue: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve review queue")
            }
        },
        Err(err) => {
            eprintln!("Error fetching review queue: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch review queue")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub approve: bool,
    pub reason: Option<String>,
}

pub async fn review_document(
    data: web::Data<Arc<Client>>,
    input: web::Json<ReviewInput>,
    path: web::Path<String>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    let document_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid document ID format"),
    };

    if !input.approve && input.reason.as_deref().unwrap_or("").trim().is_empty() {
        return HttpResponse::BadRequest().body("A rejection requires a reason");
    }

    let new_status = if input.approve {
        KycStatus::Approved
    } else {
        KycStatus::Rejected
    };

    let filter = doc! {
        "_id": document_id,
        "status": KycStatus::Pending.as_str(),
    };
    let mut set = doc! {
        "status": new_status.as_str(),
        "reviewed_by": ObjectId::parse_str(&claims.user_id).unwrap(),
        "reviewed_at": DateTime::now(),
    };
    if let Some(reason) = input.reason {
        set.insert("rejection_reason", reason);
    }

    match kyc_documents(&client)
        .update_one(filter, doc! { "$set": set })
        .await
    {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::NotFound().body("No pending document with that ID");
            }
            HttpResponse::Ok().json(serde_json::json!({
                "document_id": document_id.to_hex(),
                "status": new_status.as_str(),
            }))
        }
        Err(err) => {
            eprintln!("Error reviewing document: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to review document")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(status: KycStatus) -> KycDocument {
        KycDocument {
            id: None,
            user_id: ObjectId::new(),
            doc_type: KycDocumentType::Passport,
            storage_ref: "kyc/abc123".to_string(),
            status,
            rejection_reason: None,
            reviewed_by: None,
            submitted_at: None,
            reviewed_at: None,
        }
    }

    #[test]
    fn overall_status_prefers_approval() {
        let docs = vec![document(KycStatus::Rejected), document(KycStatus::Approved)];
        assert_eq!(overall_status(&docs), "approved");
    }

    #[test]
    fn overall_status_pending_beats_rejected() {
        let docs = vec![document(KycStatus::Rejected), document(KycStatus::Pending)];
        assert_eq!(overall_status(&docs), "pending");
    }

    #[test]
    fn overall_status_unverified_when_empty() {
        assert_eq!(overall_status(&[]), "unverified");
    }
}

use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KycDocumentType {
    Passport,
    NationalId,
    DriversLicense,
    UtilityBill,
}

impl KycDocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycDocumentType::Passport => "passport",
            KycDocumentType::NationalId => "national_id",
            KycDocumentType::DriversLicense => "drivers_license",
            KycDocumentType::UtilityBill => "utility_bill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KycDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub doc_type: KycDocumentType,
    /// Opaque pointer into the document store; uploads are handled elsewhere.
    pub storage_ref: String,
    pub status: KycStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<ObjectId>,
    pub submitted_at: Option<DateTime>,
    pub reviewed_at: Option<DateTime>,
}

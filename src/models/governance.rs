use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvestmentGroup {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub property_id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<ObjectId>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Open,
    Closed,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Poll {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub group_id: ObjectId,
    pub question: String,
    pub options: Vec<String>,
    pub status: PollStatus,
    pub closes_at: DateTime,
    pub created_by: ObjectId,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

/// One ballot per (poll, user); re-voting replaces the previous ballot.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Vote {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub poll_id: ObjectId,
    pub user_id: ObjectId,
    pub option_index: u32,
    /// Share count held when the ballot was cast.
    pub weight: i64,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOperation {
    Associate,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTransactionStatus {
    Submitted,
    Success,
    Failed,
}

/// Audit record of a call made to the Hedera bridge.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenTransaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub operation: TokenOperation,
    pub token_id: String,
    pub account_id: String,
    pub counterparty: Option<String>,
    pub amount: Option<i64>,
    pub initiated_by: Option<ObjectId>,
    pub bridge_tx_id: Option<String>,
    pub status: TokenTransactionStatus,
    pub error: Option<String>,
    pub created_at: Option<DateTime>,
}

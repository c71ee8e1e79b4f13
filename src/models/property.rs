use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub enum RentalPeriod {
    #[default]
    #[serde(rename = "night")]
    Night,
    #[serde(rename = "month")]
    Month,
}

/// Rate card for a listing. All amounts are integer minor units (cents,
/// kobo) in `currency`; nothing downstream converts to major units.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    pub amount: i64,
    pub currency: String,
    pub deposit: Option<i64>,
    pub service_charge: Option<i64>,
    #[serde(default)]
    pub period: RentalPeriod,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyLocation {
    pub city: String,
    pub state: Option<String>,
    pub country: String,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Property {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub location: PropertyLocation,
    pub property_type: String,
    pub max_guests: u32,
    /// Total tokenized shares issued for this property.
    pub total_shares: i64,
    /// Hedera token id once the property has been tokenized (e.g. "0.0.55021").
    pub token_id: Option<String>,
    pub pricing: PricingConfig,
    pub images: Option<Vec<String>>,
    pub active: bool,
    pub created_by: Option<ObjectId>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

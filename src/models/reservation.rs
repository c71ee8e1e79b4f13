use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    AwaitingPayment,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    PaymentFailed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::AwaitingPayment => "awaiting_payment",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Active => "active",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::PaymentFailed => "payment_failed",
        }
    }
}

/// Statuses that hold the dates of a reservation against other requests.
pub const BLOCKING_STATUSES: [ReservationStatus; 4] = [
    ReservationStatus::Pending,
    ReservationStatus::AwaitingPayment,
    ReservationStatus::Confirmed,
    ReservationStatus::Active,
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuestCount {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PriceLine {
    pub description: String,
    pub amount: i64,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Reservation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub property_id: ObjectId,
    pub user_id: ObjectId,
    pub status: ReservationStatus,
    pub check_in: DateTime,
    pub check_out: DateTime,
    pub guests: GuestCount,
    pub price_lines: Vec<PriceLine>,
    pub total_amount: i64,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    /// Stable reference carried through payment retries.
    pub reference: String,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

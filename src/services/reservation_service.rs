use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Client;

use crate::models::reservation::{Reservation, BLOCKING_STATUSES};
use crate::services::availability_service::DateRange;

const DB: &str = "Rentals";
const COLLECTION: &str = "Reservations";

#[derive(Debug)]
pub enum ReservationError {
    /// Another blocking reservation holds an overlapping range.
    DatesTaken,
    Database(mongodb::error::Error),
}

impl std::fmt::Display for ReservationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationError::DatesTaken => {
                write!(f, "The selected dates were booked by another guest")
            }
            ReservationError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ReservationError {}

impl From<mongodb::error::Error> for ReservationError {
    fn from(err: mongodb::error::Error) -> Self {
        ReservationError::Database(err)
    }
}

pub fn reservations(client: &Client) -> mongodb::Collection<Reservation> {
    client.database(DB).collection(COLLECTION)
}

pub fn to_bson_date(date: NaiveDate) -> DateTime {
    DateTime::from_chrono(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

pub fn to_naive_date(date: DateTime) -> NaiveDate {
    date.to_chrono().date_naive()
}

fn blocking_filter(property_id: ObjectId) -> mongodb::bson::Document {
    let statuses: Vec<&str> = BLOCKING_STATUSES.iter().map(|s| s.as_str()).collect();
    doc! {
        "property_id": property_id,
        "status": { "$in": statuses },
    }
}

pub struct ReservationService;

impl ReservationService {
    /// Occupied intervals for a property, fetched fresh on every call.
    pub async fn booked_ranges(
        client: &Client,
        property_id: ObjectId,
    ) -> Result<Vec<DateRange>, ReservationError> {
        let cursor = reservations(client)
            .find(blocking_filter(property_id))
            .await?;
        let docs: Vec<Reservation> = cursor.try_collect().await?;

        Ok(docs
            .iter()
            .filter_map(|r| DateRange::new(to_naive_date(r.check_in), to_naive_date(r.check_out)).ok())
            .collect())
    }

    /// Insert a new blocking reservation, re-checking for an overlap inside
    /// a multi-document transaction so two concurrent requests for the same
    /// dates cannot both land. The caller has already validated and priced
    /// the stay.
    pub async fn create_blocking(
        client: &Client,
        mut reservation: Reservation,
    ) -> Result<Reservation, ReservationError> {
        let collection = reservations(client);

        let mut session = client.start_session().await?;
        session.start_transaction().await?;

        let mut overlap = blocking_filter(reservation.property_id);
        overlap.insert("check_in", doc! { "$lte": reservation.check_out });
        overlap.insert("check_out", doc! { "$gte": reservation.check_in });

        let existing = match collection.find_one(overlap).session(&mut session).await {
            Ok(existing) => existing,
            Err(err) => {
                let _ = session.abort_transaction().await;
                return Err(err.into());
            }
        };

        if existing.is_some() {
            let _ = session.abort_transaction().await;
            return Err(ReservationError::DatesTaken);
        }

        let inserted = match collection
            .insert_one(&reservation)
            .session(&mut session)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                let _ = session.abort_transaction().await;
                return Err(err.into());
            }
        };

        session.commit_transaction().await?;

        reservation.id = inserted.inserted_id.as_object_id();
        Ok(reservation)
    }
}

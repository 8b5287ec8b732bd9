//! Seller submissions awaiting review.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingCar {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub price: i64,
    pub mileage: i64,
    pub fuel_type: String,
    pub transmission: String,
    pub condition: String,
    pub description: String,
    pub seller_name: String,
    pub seller_phone: String,
    pub seller_email: String,
    pub location: String,
    /// JSON array of photo file names collected on the form
    pub photos: String,
    pub created_at: String,
}

/// Payload for a new sell-your-car submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPendingCar {
    pub make: String,
    pub model: String,
    pub year: i64,
    pub price: i64,
    pub mileage: i64,
    pub fuel_type: String,
    pub transmission: String,
    pub condition: String,
    pub description: String,
    pub seller_name: String,
    pub seller_phone: String,
    pub seller_email: String,
    pub location: String,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl PendingCar {
    pub async fn create(pool: &SqlitePool, new: &NewPendingCar) -> Result<i64, sqlx::Error> {
        let photos = serde_json::to_string(&new.photos).unwrap_or_else(|_| "[]".to_string());
        let result = sqlx::query(
            "INSERT INTO pending_cars
                (make, model, year, price, mileage, fuel_type, transmission, condition,
                 description, seller_name, seller_phone, seller_email, location, photos)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.make)
        .bind(&new.model)
        .bind(new.year)
        .bind(new.price)
        .bind(new.mileage)
        .bind(&new.fuel_type)
        .bind(&new.transmission)
        .bind(&new.condition)
        .bind(&new.description)
        .bind(&new.seller_name)
        .bind(&new.seller_phone)
        .bind(&new.seller_email)
        .bind(&new.location)
        .bind(photos)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pending_cars")
            .fetch_one(pool)
            .await
    }
}

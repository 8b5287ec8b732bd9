//! Buyer inquiries (leads) and their workflow status.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Lead workflow states. Only an admin moves a lead between them.
pub const LEAD_STATUSES: [&str; 3] = ["pending", "contacted", "closed"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactRequest {
    pub id: String,
    pub car_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub status: String,
    pub budget_min: i64,
    pub budget_max: i64,
    pub financing_needed: i64,
    pub urgency_level: String,
    pub preferred_contact: String,
    /// JSON array of availability labels
    pub available_times: String,
    pub current_car_trade: i64,
    pub cash_available: i64,
    pub created_at: String,
}

/// Lead joined with the listing it refers to, for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactRequestWithCar {
    pub id: String,
    pub car_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub status: String,
    pub budget_min: i64,
    pub budget_max: i64,
    pub financing_needed: i64,
    pub urgency_level: String,
    pub preferred_contact: String,
    pub available_times: String,
    pub current_car_trade: i64,
    pub cash_available: i64,
    pub created_at: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub price: i64,
    pub location: String,
}

/// Payload for a new buyer inquiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContactRequest {
    pub car_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub budget_min: i64,
    pub budget_max: i64,
    #[serde(default)]
    pub financing_needed: bool,
    pub urgency_level: String,
    pub preferred_contact: String,
    #[serde(default)]
    pub available_times: Vec<String>,
    #[serde(default)]
    pub current_car_trade: bool,
    #[serde(default)]
    pub cash_available: bool,
}

impl ContactRequest {
    pub async fn create(pool: &SqlitePool, new: &NewContactRequest) -> Result<String, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let times = serde_json::to_string(&new.available_times).unwrap_or_else(|_| "[]".to_string());
        sqlx::query(
            "INSERT INTO contact_requests
                (id, car_id, name, email, phone, message, budget_min, budget_max,
                 financing_needed, urgency_level, preferred_contact, available_times,
                 current_car_trade, cash_available)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(new.car_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.message)
        .bind(new.budget_min)
        .bind(new.budget_max)
        .bind(new.financing_needed as i64)
        .bind(&new.urgency_level)
        .bind(&new.preferred_contact)
        .bind(times)
        .bind(new.current_car_trade as i64)
        .bind(new.cash_available as i64)
        .execute(pool)
        .await?;
        Ok(id)
    }

    /// All leads joined with car info, newest first. An empty status
    /// filter means all statuses.
    pub async fn list_with_car_info(
        pool: &SqlitePool,
        status: &str,
    ) -> Result<Vec<ContactRequestWithCar>, sqlx::Error> {
        let base = "SELECT cr.id, cr.car_id, cr.name, cr.email, cr.phone, cr.message,
                           cr.status, cr.budget_min, cr.budget_max, cr.financing_needed,
                           cr.urgency_level, cr.preferred_contact, cr.available_times,
                           cr.current_car_trade, cr.cash_available, cr.created_at,
                           c.make, c.model, c.year, c.price, c.location
                    FROM contact_requests cr
                    JOIN cars c ON cr.car_id = c.id";
        if status.is_empty() || status == "all" {
            sqlx::query_as(&format!("{base} ORDER BY cr.created_at DESC"))
                .fetch_all(pool)
                .await
        } else {
            sqlx::query_as(&format!(
                "{base} WHERE cr.status = ? ORDER BY cr.created_at DESC"
            ))
            .bind(status)
            .fetch_all(pool)
            .await
        }
    }

    /// Update only the workflow status of one lead. Returns false when the
    /// lead does not exist.
    pub async fn update_status(
        pool: &SqlitePool,
        id: &str,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE contact_requests SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contact_requests")
            .fetch_one(pool)
            .await
    }
}

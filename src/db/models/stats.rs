//! Aggregate lead statistics for the admin dashboard.
//!
//! Everything is computed in a single aggregate query so the dashboard
//! makes one call and receives a fixed record shape.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize)]
pub struct LeadStats {
    pub total_leads: i64,
    pub pending_leads: i64,
    pub contacted_leads: i64,
    pub closed_leads: i64,
    pub high_urgency_leads: i64,
    pub financing_leads: i64,
    pub cash_buyers: i64,
    /// Average of the stated budget ceilings, over leads that stated one.
    pub average_budget: i64,
    /// Commission rate applied to the listed price of every car behind a
    /// lead that is still open (pending or contacted), in COP.
    pub potential_commission: i64,
    /// closed / total, as a percentage; 0 when there are no leads.
    pub conversion_rate: f64,
}

#[derive(Debug, FromRow)]
struct RawLeadStats {
    total_leads: i64,
    pending_leads: i64,
    contacted_leads: i64,
    closed_leads: i64,
    high_urgency_leads: i64,
    financing_leads: i64,
    cash_buyers: i64,
    average_budget: f64,
    open_lead_value: i64,
}

impl LeadStats {
    pub async fn calculate(
        pool: &SqlitePool,
        commission_rate: f64,
    ) -> Result<LeadStats, sqlx::Error> {
        let raw: RawLeadStats = sqlx::query_as(
            "SELECT
                COUNT(*) AS total_leads,
                COALESCE(SUM(CASE WHEN cr.status = 'pending' THEN 1 ELSE 0 END), 0) AS pending_leads,
                COALESCE(SUM(CASE WHEN cr.status = 'contacted' THEN 1 ELSE 0 END), 0) AS contacted_leads,
                COALESCE(SUM(CASE WHEN cr.status = 'closed' THEN 1 ELSE 0 END), 0) AS closed_leads,
                COALESCE(SUM(CASE WHEN cr.urgency_level = 'high' THEN 1 ELSE 0 END), 0) AS high_urgency_leads,
                COALESCE(SUM(CASE WHEN cr.financing_needed = 1 THEN 1 ELSE 0 END), 0) AS financing_leads,
                COALESCE(SUM(CASE WHEN cr.cash_available = 1 THEN 1 ELSE 0 END), 0) AS cash_buyers,
                COALESCE(AVG(CASE WHEN cr.budget_max > 0 THEN cr.budget_max END), 0.0) AS average_budget,
                COALESCE(SUM(CASE WHEN cr.status != 'closed' THEN c.price ELSE 0 END), 0) AS open_lead_value
             FROM contact_requests cr
             JOIN cars c ON cr.car_id = c.id",
        )
        .fetch_one(pool)
        .await?;

        let conversion_rate = if raw.total_leads > 0 {
            raw.closed_leads as f64 / raw.total_leads as f64 * 100.0
        } else {
            0.0
        };

        Ok(LeadStats {
            total_leads: raw.total_leads,
            pending_leads: raw.pending_leads,
            contacted_leads: raw.contacted_leads,
            closed_leads: raw.closed_leads,
            high_urgency_leads: raw.high_urgency_leads,
            financing_leads: raw.financing_leads,
            cash_buyers: raw.cash_buyers,
            average_budget: raw.average_budget.round() as i64,
            potential_commission: (raw.open_lead_value as f64 * commission_rate).round() as i64,
            conversion_rate,
        })
    }
}

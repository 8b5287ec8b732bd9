//! Buyer-lead endpoints.
//!
//! Creating a lead is public; everything else requires the admin role and
//! sits behind the auth middleware in the router.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{Car, ContactRequest, ContactRequestWithCar, LeadStats, NewContactRequest};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation;

fn validate_contact_request(new: &NewContactRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_person_name(&new.name) {
        errors.add("name", e);
    }
    if let Err(e) = validation::validate_email(&new.email) {
        errors.add("email", e);
    }
    if let Err(e) = validation::validate_phone(&new.phone) {
        errors.add("phone", e);
    }
    if let Err(e) = validation::validate_budget(new.budget_min, new.budget_max) {
        errors.add("budget_max", e);
    }
    if let Err(e) = validation::validate_urgency_level(&new.urgency_level) {
        errors.add("urgency_level", e);
    }
    if let Err(e) = validation::validate_contact_channel(&new.preferred_contact) {
        errors.add("preferred_contact", e);
    }
    errors.finish()
}

/// POST /api/contact-requests
pub async fn create_contact_request(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewContactRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_contact_request(&new)?;

    // The lead must reference a real car; a dangling car_id would also be
    // rejected by the foreign key, but this gives a clear message.
    if Car::find_by_id(&state.db, new.car_id).await?.is_none() {
        return Err(ApiError::not_found("Car not found"));
    }

    let id = ContactRequest::create(&state.db, &new).await?;
    tracing::info!(lead_id = %id, car_id = new.car_id, "new buyer lead");

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadListQuery {
    #[serde(default)]
    pub status: String,
}

/// GET /api/leads?status=pending|contacted|closed|all
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<Vec<ContactRequestWithCar>>, ApiError> {
    if !query.status.is_empty() && query.status != "all" {
        validation::validate_lead_status(&query.status)
            .map_err(|e| ApiError::validation_field("status", e))?;
    }
    let leads = ContactRequest::list_with_car_info(&state.db, &query.status).await?;
    Ok(Json(leads))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// PATCH /api/leads/:id/status
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    validation::validate_lead_status(&update.status)
        .map_err(|e| ApiError::validation_field("status", e))?;

    let updated = ContactRequest::update_status(&state.db, &id, &update.status).await?;
    if !updated {
        return Err(ApiError::not_found("Lead not found"));
    }
    tracing::info!(lead_id = %id, status = %update.status, "lead status changed");

    Ok(Json(json!({ "id": id, "status": update.status })))
}

/// GET /api/leads/stats
pub async fn lead_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeadStats>, ApiError> {
    let stats = LeadStats::calculate(&state.db, state.config.site.commission_rate).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewContactRequest {
        NewContactRequest {
            car_id: 1,
            name: "Carlos Ruiz".to_string(),
            email: "carlos@example.com".to_string(),
            phone: "3109876543".to_string(),
            message: String::new(),
            budget_min: 0,
            budget_max: 70_000_000,
            financing_needed: false,
            urgency_level: "medium".to_string(),
            preferred_contact: "phone".to_string(),
            available_times: vec![],
            current_car_trade: false,
            cash_available: true,
        }
    }

    #[test]
    fn valid_lead_passes() {
        assert!(validate_contact_request(&sample()).is_ok());
    }

    #[test]
    fn missing_budget_is_rejected() {
        let mut new = sample();
        new.budget_max = 0;
        let err = validate_contact_request(&new).unwrap_err();
        assert!(err.details().unwrap().contains_key("budget_max"));
    }

    #[test]
    fn inverted_budget_range_is_rejected() {
        let mut new = sample();
        new.budget_min = 90_000_000;
        new.budget_max = 70_000_000;
        assert!(validate_contact_request(&new).is_err());
    }

    #[test]
    fn unknown_urgency_is_rejected() {
        let mut new = sample();
        new.urgency_level = "urgent".to_string();
        let err = validate_contact_request(&new).unwrap_err();
        assert!(err.details().unwrap().contains_key("urgency_level"));
    }
}

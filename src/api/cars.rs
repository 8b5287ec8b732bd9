//! Car catalog endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::db::{Car, CarFilters, NewPendingCar, PendingCar};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation;

/// GET /api/cars
///
/// Only cars with status 'available' are listed. All filter parameters
/// are optional; a zero or empty value means "no constraint".
pub async fn list_cars(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<CarFilters>,
) -> Result<Json<Vec<Car>>, ApiError> {
    let cars = Car::list(&state.db, &filters).await?;
    Ok(Json(cars))
}

/// GET /api/cars/:id
pub async fn get_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Car>, ApiError> {
    Car::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Car not found"))
}

fn validate_pending_car(new: &NewPendingCar, max_photos: usize) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_make(&new.make) {
        errors.add("make", e);
    }
    if let Err(e) = validation::validate_model(&new.model) {
        errors.add("model", e);
    }
    if let Err(e) = validation::validate_year(new.year) {
        errors.add("year", e);
    }
    if let Err(e) = validation::validate_price(new.price) {
        errors.add("price", e);
    }
    if let Err(e) = validation::validate_mileage(new.mileage) {
        errors.add("mileage", e);
    }
    if let Err(e) = validation::validate_fuel_type(&new.fuel_type) {
        errors.add("fuel_type", e);
    }
    if let Err(e) = validation::validate_transmission(&new.transmission) {
        errors.add("transmission", e);
    }
    if let Err(e) = validation::validate_condition(&new.condition) {
        errors.add("condition", e);
    }
    if let Err(e) = validation::validate_description(&new.description) {
        errors.add("description", e);
    }
    if let Err(e) = validation::validate_person_name(&new.seller_name) {
        errors.add("seller_name", e);
    }
    if let Err(e) = validation::validate_phone(&new.seller_phone) {
        errors.add("seller_phone", e);
    }
    if let Err(e) = validation::validate_email(&new.seller_email) {
        errors.add("seller_email", e);
    }
    if let Err(e) = validation::validate_location(&new.location) {
        errors.add("location", e);
    }
    if new.photos.len() > max_photos {
        errors.add("photos", format!("Máximo {max_photos} fotos"));
    }
    errors.finish()
}

/// POST /api/pending-cars
///
/// A seller submission. The car is not published; it lands in the review
/// queue and the response only acknowledges receipt.
pub async fn create_pending_car(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewPendingCar>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_pending_car(&new, state.config.site.max_photos)?;

    let id = PendingCar::create(&state.db, &new).await?;
    tracing::info!(
        pending_car_id = id,
        make = %new.make,
        model = %new.model,
        "sell submission received"
    );

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

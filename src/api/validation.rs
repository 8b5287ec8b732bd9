//! Field validation rules shared by the wizard forms and the JSON API.
//!
//! Every rule is pure and synchronous against in-memory values. User-facing
//! messages are Spanish, matching the rest of the site copy. For collecting
//! multiple errors into one response, use `ValidationErrorBuilder` from the
//! `error` module.

use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic email shape check; deliverability is not our problem.
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// Colombian phone numbers as typed by users: digits with optional
    /// spaces, dashes, parentheses and a leading +.
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 ()-]{5,19}$").unwrap();
}

pub const FUEL_TYPES: [&str; 4] = ["Gasolina", "Diesel", "Eléctrico", "Híbrido"];
pub const TRANSMISSIONS: [&str; 2] = ["Automática", "Manual"];
pub const CONDITIONS: [&str; 4] = ["Excelente", "Muy Bueno", "Bueno", "Regular"];
pub const URGENCY_LEVELS: [&str; 3] = ["low", "medium", "high"];
pub const CONTACT_CHANNELS: [&str; 3] = ["phone", "email", "whatsapp"];

/// Minimum asking price for a listing, in COP.
pub const MIN_PRICE: i64 = 1_000_000;

pub fn validate_make(make: &str) -> Result<(), String> {
    if make.trim().chars().count() < 2 {
        return Err("La marca debe tener al menos 2 caracteres.".to_string());
    }
    Ok(())
}

pub fn validate_model(model: &str) -> Result<(), String> {
    if model.trim().is_empty() {
        return Err("El modelo es requerido.".to_string());
    }
    Ok(())
}

pub fn validate_year(year: i64) -> Result<(), String> {
    let next_year = chrono::Utc::now().year() as i64 + 1;
    if year < 1980 {
        return Err("El año debe ser mayor a 1980.".to_string());
    }
    if year > next_year {
        return Err("El año no puede ser del futuro.".to_string());
    }
    Ok(())
}

pub fn validate_price(price: i64) -> Result<(), String> {
    if price < MIN_PRICE {
        return Err("El precio debe ser mayor a $1.000.000 COP.".to_string());
    }
    Ok(())
}

pub fn validate_mileage(mileage: i64) -> Result<(), String> {
    if mileage < 0 {
        return Err("El kilometraje no puede ser negativo.".to_string());
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.trim().chars().count() < 10 {
        return Err("La descripción debe tener al menos 10 caracteres.".to_string());
    }
    Ok(())
}

pub fn validate_person_name(name: &str) -> Result<(), String> {
    if name.trim().chars().count() < 2 {
        return Err("Tu nombre es requerido.".to_string());
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    let trimmed = phone.trim();
    if trimmed.chars().filter(|c| c.is_ascii_digit()).count() < 7 {
        return Err("Tu teléfono es requerido.".to_string());
    }
    if !PHONE_REGEX.is_match(trimmed) {
        return Err("Teléfono inválido.".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if !EMAIL_REGEX.is_match(email.trim()) {
        return Err("Email inválido.".to_string());
    }
    Ok(())
}

pub fn validate_location(location: &str) -> Result<(), String> {
    if location.trim().chars().count() < 3 {
        return Err("La ubicación es requerida.".to_string());
    }
    Ok(())
}

fn validate_enum(value: &str, allowed: &[&str], label: &str) -> Result<(), String> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(format!("{label} debe ser uno de: {}", allowed.join(", ")))
    }
}

pub fn validate_fuel_type(fuel_type: &str) -> Result<(), String> {
    validate_enum(fuel_type, &FUEL_TYPES, "El combustible")
}

pub fn validate_transmission(transmission: &str) -> Result<(), String> {
    validate_enum(transmission, &TRANSMISSIONS, "La transmisión")
}

pub fn validate_condition(condition: &str) -> Result<(), String> {
    validate_enum(condition, &CONDITIONS, "El estado del vehículo")
}

pub fn validate_urgency_level(urgency: &str) -> Result<(), String> {
    validate_enum(urgency, &URGENCY_LEVELS, "El nivel de urgencia")
}

pub fn validate_contact_channel(channel: &str) -> Result<(), String> {
    validate_enum(channel, &CONTACT_CHANNELS, "El medio de contacto")
}

pub fn validate_lead_status(status: &str) -> Result<(), String> {
    validate_enum(status, &crate::db::LEAD_STATUSES, "El estado")
}

/// Cross-field budget rule, owned by the step that declares both fields.
pub fn validate_budget(budget_min: i64, budget_max: i64) -> Result<(), String> {
    if budget_max <= 0 {
        return Err("El presupuesto máximo debe ser mayor a 0.".to_string());
    }
    if budget_min < 0 {
        return Err("El presupuesto mínimo no puede ser negativo.".to_string());
    }
    if budget_min > budget_max {
        return Err("El presupuesto mínimo no puede superar al máximo.".to_string());
    }
    Ok(())
}

// Askama template definitions

use askama::Template;

use crate::db::{Car, CarFilters, ContactRequestWithCar, LeadStats};
use crate::wizard::{ContactForm, SellCarForm};

/// Custom filters for Askama templates
mod filters {
    /// Colombian peso formatting: 85000000 -> "$85.000.000"
    pub fn cop(value: &i64) -> ::askama::Result<String> {
        let digits = value.abs().to_string();
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push('.');
            }
            out.push(c);
        }
        let sign = if *value < 0 { "-" } else { "" };
        Ok(format!("{sign}${out}"))
    }

    pub fn km(value: &i64) -> ::askama::Result<String> {
        Ok(format!("{} km", value))
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub cars: Vec<Car>,
    pub filters: CarFilters,
    pub fuel_types: Vec<String>,
    pub transmissions: Vec<String>,
}

#[derive(Template)]
#[template(path = "car_detail.html")]
pub struct CarDetailTemplate {
    pub car: Car,
    pub images: Vec<String>,
    pub features: Vec<String>,
}

#[derive(Template)]
#[template(path = "sell_wizard.html")]
pub struct SellWizardTemplate {
    pub step: usize,
    pub step_count: usize,
    pub form: SellCarForm,
    pub errors: Vec<String>,
    pub photos: Vec<String>,
    pub failure: Option<String>,
    pub submitted: bool,
    pub conditions: Vec<String>,
    pub fuel_types: Vec<String>,
    pub transmissions: Vec<String>,
    pub max_photos: usize,
}

#[derive(Template)]
#[template(path = "contact_wizard.html")]
pub struct ContactWizardTemplate {
    pub car: Car,
    pub step: usize,
    pub step_count: usize,
    pub form: ContactForm,
    pub errors: Vec<String>,
    pub failure: Option<String>,
    pub submitted: bool,
    pub urgency_levels: Vec<String>,
    pub contact_channels: Vec<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub leads: Vec<ContactRequestWithCar>,
    pub stats: LeadStats,
    pub status_filter: String,
    pub statuses: Vec<String>,
}

#[derive(Template)]
#[template(path = "creditos.html")]
pub struct CreditosTemplate {
    pub price: i64,
    pub down_payment: i64,
    pub months: i64,
    pub annual_rate: f64,
    pub monthly_payment: i64,
    pub computed: bool,
}

#[derive(Template)]
#[template(path = "seguros.html")]
pub struct SegurosTemplate;

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate;

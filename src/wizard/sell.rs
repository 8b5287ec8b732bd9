//! The three-step sell-your-car form.
//!
//! Step 1: basics (make, model, year, price, condition).
//! Step 2: details (mileage, fuel type, transmission, description); photos
//! are attached here but never gate the step.
//! Step 3: seller contact details.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::{FieldErrors, WizardForm};
use crate::api::validation::{
    validate_condition, validate_description, validate_email, validate_fuel_type,
    validate_location, validate_make, validate_mileage, validate_model, validate_person_name,
    validate_phone, validate_price, validate_transmission, validate_year,
};
use crate::db::NewPendingCar;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellCarForm {
    pub make: String,
    pub model: String,
    pub year: i64,
    pub price: i64,
    pub condition: String,
    pub mileage: i64,
    pub fuel_type: String,
    pub transmission: String,
    pub description: String,
    pub seller_name: String,
    pub seller_phone: String,
    pub seller_email: String,
    pub location: String,
}

impl Default for SellCarForm {
    fn default() -> Self {
        Self {
            make: String::new(),
            model: String::new(),
            year: chrono::Utc::now().year() as i64,
            price: 50_000_000,
            condition: "Bueno".to_string(),
            mileage: 0,
            fuel_type: String::new(),
            transmission: String::new(),
            description: String::new(),
            seller_name: String::new(),
            seller_phone: String::new(),
            seller_email: String::new(),
            location: String::new(),
        }
    }
}

impl SellCarForm {
    /// Build the review-queue payload once the wizard allowed submission.
    pub fn into_pending_car(self, photos: Vec<String>) -> NewPendingCar {
        NewPendingCar {
            make: self.make,
            model: self.model,
            year: self.year,
            price: self.price,
            mileage: self.mileage,
            fuel_type: self.fuel_type,
            transmission: self.transmission,
            condition: self.condition,
            description: self.description,
            seller_name: self.seller_name,
            seller_phone: self.seller_phone,
            seller_email: self.seller_email,
            location: self.location,
            photos,
        }
    }
}

fn push(errors: &mut FieldErrors, field: &str, result: Result<(), String>) {
    if let Err(message) = result {
        errors.entry(field.to_string()).or_default().push(message);
    }
}

impl WizardForm for SellCarForm {
    const STEP_COUNT: usize = 3;

    fn validate_step(&self, step: usize) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            1 => {
                push(&mut errors, "make", validate_make(&self.make));
                push(&mut errors, "model", validate_model(&self.model));
                push(&mut errors, "year", validate_year(self.year));
                push(&mut errors, "price", validate_price(self.price));
                push(&mut errors, "condition", validate_condition(&self.condition));
            }
            2 => {
                push(&mut errors, "mileage", validate_mileage(self.mileage));
                push(&mut errors, "fuel_type", validate_fuel_type(&self.fuel_type));
                push(
                    &mut errors,
                    "transmission",
                    validate_transmission(&self.transmission),
                );
                push(
                    &mut errors,
                    "description",
                    validate_description(&self.description),
                );
            }
            3 => {
                push(
                    &mut errors,
                    "seller_name",
                    validate_person_name(&self.seller_name),
                );
                push(&mut errors, "seller_phone", validate_phone(&self.seller_phone));
                push(&mut errors, "seller_email", validate_email(&self.seller_email));
                push(&mut errors, "location", validate_location(&self.location));
            }
            _ => {}
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{Wizard, WizardError};

    fn valid_step1(form: &mut SellCarForm) {
        form.make = "Toyota".to_string();
        form.model = "Corolla".to_string();
        form.year = 2024;
        form.price = 50_000_000;
        form.condition = "Bueno".to_string();
    }

    fn valid_step2(form: &mut SellCarForm) {
        form.mileage = 25_000;
        form.fuel_type = "Gasolina".to_string();
        form.transmission = "Automática".to_string();
        form.description = "Único dueño, mantenimientos al día.".to_string();
    }

    fn valid_step3(form: &mut SellCarForm) {
        form.seller_name = "Carlos Pérez".to_string();
        form.seller_phone = "300 123 4567".to_string();
        form.seller_email = "carlos@example.com".to_string();
        form.location = "Medellín, Antioquia".to_string();
    }

    #[test]
    fn defaults_match_the_documented_initial_values() {
        let form = SellCarForm::default();
        assert_eq!(form.price, 50_000_000);
        assert_eq!(form.condition, "Bueno");
        assert_eq!(form.year, chrono::Utc::now().year() as i64);
        assert!(form.make.is_empty());
    }

    #[test]
    fn step1_with_valid_basics_advances_to_step2() {
        let mut wizard = Wizard::<SellCarForm>::new();
        valid_step1(&mut wizard.form);
        wizard.advance().unwrap();
        assert_eq!(wizard.step(), 2);
    }

    #[test]
    fn step1_rejects_short_make_and_low_price() {
        let mut wizard = Wizard::<SellCarForm>::new();
        valid_step1(&mut wizard.form);
        wizard.form.make = "T".to_string();
        wizard.form.price = 500_000;

        assert_eq!(wizard.advance(), Err(WizardError::Validation));
        assert_eq!(wizard.step(), 1);
        assert!(wizard.errors().contains_key("make"));
        assert!(wizard.errors().contains_key("price"));
        // Step 2 fields are not validated on step 1
        assert!(!wizard.errors().contains_key("description"));
    }

    #[test]
    fn step2_owns_details_and_description_length() {
        let mut wizard = Wizard::<SellCarForm>::new();
        valid_step1(&mut wizard.form);
        wizard.advance().unwrap();

        wizard.form.description = "corta".to_string();
        assert_eq!(wizard.advance(), Err(WizardError::Validation));
        assert!(wizard.errors().contains_key("description"));
        assert!(wizard.errors().contains_key("fuel_type"));

        valid_step2(&mut wizard.form);
        wizard.advance().unwrap();
        assert_eq!(wizard.step(), 3);
    }

    #[test]
    fn full_walkthrough_reaches_submit() {
        let mut wizard = Wizard::<SellCarForm>::new();
        valid_step1(&mut wizard.form);
        wizard.advance().unwrap();
        valid_step2(&mut wizard.form);
        wizard.advance().unwrap();
        valid_step3(&mut wizard.form);
        wizard.begin_submit().unwrap();

        let pending = wizard.form.clone().into_pending_car(vec!["f.jpg".to_string()]);
        assert_eq!(pending.make, "Toyota");
        assert_eq!(pending.photos, vec!["f.jpg".to_string()]);
    }
}

//! The three-step buyer contact form, attached to one listing.
//!
//! Step 1: who the buyer is. Step 2: budget and purchase preferences (owns
//! the cross-field budget rule). Step 3: message and availability.

use serde::{Deserialize, Serialize};

use super::{FieldErrors, WizardForm};
use crate::api::validation::{
    validate_budget, validate_contact_channel, validate_email, validate_person_name,
    validate_phone, validate_urgency_level,
};
use crate::db::NewContactRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub budget_min: i64,
    pub budget_max: i64,
    pub financing_needed: bool,
    pub urgency_level: String,
    pub preferred_contact: String,
    pub message: String,
    pub available_times: Vec<String>,
    pub current_car_trade: bool,
    pub cash_available: bool,
}

impl Default for ContactForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            budget_min: 0,
            budget_max: 0,
            financing_needed: false,
            urgency_level: "medium".to_string(),
            preferred_contact: "phone".to_string(),
            message: String::new(),
            available_times: Vec::new(),
            current_car_trade: false,
            cash_available: false,
        }
    }
}

impl ContactForm {
    /// Default state with the greeting prefilled for one listing.
    pub fn for_car(car_title: &str) -> Self {
        Self {
            message: format!(
                "Hola, estoy interesado en el {car_title}. Me gustaría obtener más información y agendar una cita para verlo."
            ),
            ..Self::default()
        }
    }

    pub fn into_contact_request(self, car_id: i64) -> NewContactRequest {
        NewContactRequest {
            car_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            message: self.message,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            financing_needed: self.financing_needed,
            urgency_level: self.urgency_level,
            preferred_contact: self.preferred_contact,
            available_times: self.available_times,
            current_car_trade: self.current_car_trade,
            cash_available: self.cash_available,
        }
    }
}

fn push(errors: &mut FieldErrors, field: &str, result: Result<(), String>) {
    if let Err(message) = result {
        errors.entry(field.to_string()).or_default().push(message);
    }
}

impl WizardForm for ContactForm {
    const STEP_COUNT: usize = 3;

    fn validate_step(&self, step: usize) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            1 => {
                push(&mut errors, "name", validate_person_name(&self.name));
                push(&mut errors, "email", validate_email(&self.email));
                push(&mut errors, "phone", validate_phone(&self.phone));
            }
            2 => {
                push(
                    &mut errors,
                    "budget_max",
                    validate_budget(self.budget_min, self.budget_max),
                );
                push(
                    &mut errors,
                    "urgency_level",
                    validate_urgency_level(&self.urgency_level),
                );
                push(
                    &mut errors,
                    "preferred_contact",
                    validate_contact_channel(&self.preferred_contact),
                );
            }
            // Step 3 is optional detail; the prefilled message always passes.
            _ => {}
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{SubmitStatus, Wizard, WizardError};

    fn valid_step1(form: &mut ContactForm) {
        form.name = "Ana Gómez".to_string();
        form.email = "ana@example.com".to_string();
        form.phone = "300 123 4567".to_string();
    }

    #[test]
    fn defaults_are_medium_urgency_by_phone() {
        let form = ContactForm::default();
        assert_eq!(form.urgency_level, "medium");
        assert_eq!(form.preferred_contact, "phone");
        assert_eq!(form.budget_max, 0);
    }

    #[test]
    fn for_car_prefills_the_greeting() {
        let form = ContactForm::for_car("Toyota Corolla 2021");
        assert!(form.message.contains("Toyota Corolla 2021"));
    }

    #[test]
    fn zero_budget_max_blocks_step2_and_submission() {
        let mut wizard = Wizard::<ContactForm>::new();
        valid_step1(&mut wizard.form);
        wizard.advance().unwrap();
        assert_eq!(wizard.step(), 2);

        // budget_max = 0 must not pass
        assert_eq!(wizard.advance(), Err(WizardError::Validation));
        assert!(wizard.errors().contains_key("budget_max"));

        // Even if the step gate were bypassed, the final full-record
        // validation blocks the create call.
        let mut bypassed = Wizard::<ContactForm>::new();
        valid_step1(&mut bypassed.form);
        bypassed.advance().unwrap();
        bypassed.form.budget_max = 1;
        bypassed.advance().unwrap();
        bypassed.form.budget_max = 0;
        assert_eq!(bypassed.begin_submit(), Err(WizardError::Validation));
        assert_eq!(bypassed.status(), &SubmitStatus::Editing);
    }

    #[test]
    fn budget_min_may_not_exceed_budget_max() {
        let mut wizard = Wizard::<ContactForm>::new();
        valid_step1(&mut wizard.form);
        wizard.advance().unwrap();
        wizard.form.budget_min = 90_000_000;
        wizard.form.budget_max = 80_000_000;
        assert_eq!(wizard.advance(), Err(WizardError::Validation));
    }

    #[test]
    fn complete_walkthrough_submits_once() {
        let mut wizard = Wizard::<ContactForm>::new();
        valid_step1(&mut wizard.form);
        wizard.advance().unwrap();
        wizard.form.budget_min = 60_000_000;
        wizard.form.budget_max = 80_000_000;
        wizard.form.urgency_level = "high".to_string();
        wizard.advance().unwrap();
        assert_eq!(wizard.step(), 3);

        wizard.begin_submit().unwrap();
        assert_eq!(wizard.begin_submit(), Err(WizardError::SubmitInFlight));

        wizard.submit_succeeded();
        assert_eq!(wizard.step(), 1);
        assert_eq!(wizard.form.budget_max, 0);
    }

    #[test]
    fn request_payload_carries_the_car_id() {
        let mut form = ContactForm::for_car("Mazda 3 2022");
        valid_step1(&mut form);
        form.budget_max = 80_000_000;
        let request = form.into_contact_request(42);
        assert_eq!(request.car_id, 42);
        assert!(request.message.contains("Mazda 3 2022"));
    }
}

//! Multi-step form state machine.
//!
//! Both data-entry forms (sell-your-car and buyer contact) walk an ordered
//! sequence of steps. Each step owns a subset of the record's fields and
//! gates progression on those fields alone; the record is submitted once,
//! atomically, from the final step. The machine is pure: transitions only
//! touch in-memory state, so the step logic is testable without a rendering
//! surface or a database.

pub mod contact;
pub mod sell;

pub use contact::ContactForm;
pub use sell::SellCarForm;

use std::collections::HashMap;
use thiserror::Error;

/// Field name to validation messages.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// A form that can be driven by [`Wizard`].
///
/// `Default` supplies the documented initial values that a successful
/// submit resets the form to.
pub trait WizardForm: Default {
    /// Number of steps, 1-based.
    const STEP_COUNT: usize;

    /// Validate only the fields declared for `step`. Pure and synchronous.
    fn validate_step(&self, step: usize) -> FieldErrors;

    /// Validate the whole record, used once more before submission.
    fn validate_all(&self) -> FieldErrors {
        let mut all = FieldErrors::new();
        for step in 1..=Self::STEP_COUNT {
            for (field, mut messages) in self.validate_step(step) {
                all.entry(field).or_default().append(&mut messages);
            }
        }
        all
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The user is still filling fields in.
    Editing,
    /// A create call is in flight; further submits are rejected.
    InFlight,
    /// The last submission failed; entered data is kept.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("the current step has validation errors")]
    Validation,
    #[error("already on the final step")]
    AtFinalStep,
    #[error("submit is only available from the final step")]
    NotFinalStep,
    #[error("a submission is already in flight")]
    SubmitInFlight,
    #[error("at most {0} photos are allowed")]
    TooManyPhotos(usize),
}

/// The wizard state: current step, the record under construction, the
/// last validation errors, and the submission status.
#[derive(Debug, Clone)]
pub struct Wizard<F: WizardForm> {
    pub form: F,
    step: usize,
    errors: FieldErrors,
    status: SubmitStatus,
    photos: Vec<String>,
}

impl<F: WizardForm> Default for Wizard<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: WizardForm> Wizard<F> {
    pub fn new() -> Self {
        Self {
            form: F::default(),
            step: 1,
            errors: FieldErrors::new(),
            status: SubmitStatus::Editing,
            photos: Vec::new(),
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_final_step(&self) -> bool {
        self.step == F::STEP_COUNT
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn status(&self) -> &SubmitStatus {
        &self.status
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    /// Validate the current step's fields; on success move one step
    /// forward. On failure the step index is unchanged and the field
    /// errors are recorded; entered data is never dropped.
    pub fn advance(&mut self) -> Result<(), WizardError> {
        if self.step >= F::STEP_COUNT {
            return Err(WizardError::AtFinalStep);
        }
        let errors = self.form.validate_step(self.step);
        if errors.is_empty() {
            self.errors.clear();
            self.step += 1;
            Ok(())
        } else {
            self.errors = errors;
            Err(WizardError::Validation)
        }
    }

    /// Move one step back without re-validating the step being left.
    pub fn retreat(&mut self) {
        if self.step > 1 {
            self.step -= 1;
            self.errors.clear();
        }
    }

    /// Gate a submission: only from the final step, only when no other
    /// submission is in flight, and only when the whole record validates.
    /// On success the status flips to `InFlight`; the caller performs the
    /// single create call and reports back via [`Wizard::submit_succeeded`]
    /// or [`Wizard::submit_failed`].
    pub fn begin_submit(&mut self) -> Result<(), WizardError> {
        if self.step != F::STEP_COUNT {
            return Err(WizardError::NotFinalStep);
        }
        if self.status == SubmitStatus::InFlight {
            return Err(WizardError::SubmitInFlight);
        }
        let errors = self.form.validate_all();
        if !errors.is_empty() {
            self.errors = errors;
            return Err(WizardError::Validation);
        }
        self.errors.clear();
        self.status = SubmitStatus::InFlight;
        Ok(())
    }

    /// The create call went through: reset every field to its default,
    /// drop attachments, and return to step 1.
    pub fn submit_succeeded(&mut self) {
        self.form = F::default();
        self.photos.clear();
        self.errors.clear();
        self.step = 1;
        self.status = SubmitStatus::Editing;
    }

    /// The create call failed: stay on the final step with data intact.
    pub fn submit_failed(&mut self, message: impl Into<String>) {
        self.status = SubmitStatus::Failed(message.into());
    }

    /// Photos are a side channel: they can be attached at any step and do
    /// not participate in step gating.
    pub fn add_photo(&mut self, name: impl Into<String>, cap: usize) -> Result<(), WizardError> {
        if self.photos.len() >= cap {
            return Err(WizardError::TooManyPhotos(cap));
        }
        self.photos.push(name.into());
        Ok(())
    }

    pub fn remove_photo(&mut self, index: usize) {
        if index < self.photos.len() {
            self.photos.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-step form: step 1 requires a non-empty name, step 2 a positive
    /// amount.
    #[derive(Debug, Default)]
    struct TestForm {
        name: String,
        amount: i64,
    }

    impl WizardForm for TestForm {
        const STEP_COUNT: usize = 2;

        fn validate_step(&self, step: usize) -> FieldErrors {
            let mut errors = FieldErrors::new();
            match step {
                1 => {
                    if self.name.is_empty() {
                        errors.entry("name".into()).or_default().push("required".into());
                    }
                }
                2 => {
                    if self.amount <= 0 {
                        errors
                            .entry("amount".into())
                            .or_default()
                            .push("must be positive".into());
                    }
                }
                _ => {}
            }
            errors
        }
    }

    #[test]
    fn advance_blocks_on_invalid_step_and_keeps_data() {
        let mut wizard = Wizard::<TestForm>::new();
        assert_eq!(wizard.advance(), Err(WizardError::Validation));
        assert_eq!(wizard.step(), 1);
        assert!(wizard.errors().contains_key("name"));

        wizard.form.name = "Ana".to_string();
        wizard.advance().unwrap();
        assert_eq!(wizard.step(), 2);
        assert!(wizard.errors().is_empty());
        assert_eq!(wizard.form.name, "Ana");
    }

    #[test]
    fn retreat_never_validates_and_stops_at_one() {
        let mut wizard = Wizard::<TestForm>::new();
        wizard.form.name = "Ana".to_string();
        wizard.advance().unwrap();
        wizard.form.name.clear();
        wizard.retreat();
        assert_eq!(wizard.step(), 1);
        wizard.retreat();
        assert_eq!(wizard.step(), 1);
    }

    #[test]
    fn submit_only_from_final_step() {
        let mut wizard = Wizard::<TestForm>::new();
        assert_eq!(wizard.begin_submit(), Err(WizardError::NotFinalStep));
    }

    #[test]
    fn double_submit_is_rejected_while_in_flight() {
        let mut wizard = Wizard::<TestForm>::new();
        wizard.form.name = "Ana".to_string();
        wizard.form.amount = 10;
        wizard.advance().unwrap();

        wizard.begin_submit().unwrap();
        assert_eq!(wizard.status(), &SubmitStatus::InFlight);
        // Second click while the create call is still pending
        assert_eq!(wizard.begin_submit(), Err(WizardError::SubmitInFlight));
    }

    #[test]
    fn successful_submit_resets_to_defaults_and_step_one() {
        let mut wizard = Wizard::<TestForm>::new();
        wizard.form.name = "Ana".to_string();
        wizard.form.amount = 10;
        wizard.add_photo("a.jpg", 10).unwrap();
        wizard.advance().unwrap();
        wizard.begin_submit().unwrap();

        wizard.submit_succeeded();
        assert_eq!(wizard.step(), 1);
        assert_eq!(wizard.form.name, "");
        assert_eq!(wizard.form.amount, 0);
        assert!(wizard.photos().is_empty());
        assert_eq!(wizard.status(), &SubmitStatus::Editing);
    }

    #[test]
    fn failed_submit_keeps_data_on_final_step() {
        let mut wizard = Wizard::<TestForm>::new();
        wizard.form.name = "Ana".to_string();
        wizard.form.amount = 10;
        wizard.advance().unwrap();
        wizard.begin_submit().unwrap();

        wizard.submit_failed("database unreachable");
        assert_eq!(wizard.step(), 2);
        assert_eq!(wizard.form.name, "Ana");
        assert_eq!(
            wizard.status(),
            &SubmitStatus::Failed("database unreachable".to_string())
        );

        // The user may retry manually after a failure
        assert!(wizard.begin_submit().is_ok());
    }

    #[test]
    fn invalid_record_blocks_submission_entirely() {
        let mut wizard = Wizard::<TestForm>::new();
        wizard.form.name = "Ana".to_string();
        wizard.advance().unwrap();
        // amount still invalid on the final step
        assert_eq!(wizard.begin_submit(), Err(WizardError::Validation));
        assert_eq!(wizard.status(), &SubmitStatus::Editing);
        assert!(wizard.errors().contains_key("amount"));
    }

    #[test]
    fn photo_side_channel_is_capped_but_never_gates_steps() {
        let mut wizard = Wizard::<TestForm>::new();
        wizard.add_photo("a.jpg", 2).unwrap();
        wizard.add_photo("b.jpg", 2).unwrap();
        assert_eq!(
            wizard.add_photo("c.jpg", 2),
            Err(WizardError::TooManyPhotos(2))
        );
        wizard.remove_photo(0);
        assert_eq!(wizard.photos(), ["b.jpg"]);

        // Photos don't make an invalid step valid or vice versa
        assert_eq!(wizard.advance(), Err(WizardError::Validation));
    }
}

//! Status classification.
//!
//! EVALUATION ORDER (fixed, never reordered):
//!   1. Children below INCOME_START_AGE are students.
//!   2. Retirement, from `retirement_start_age`.
//!   3. Employment, from the reference rate dampened by income.
//!   4. Student or disabled fallback.
//!
//! Each step that draws consumes exactly one roll from the status stream.

use crate::{
    config::SynthesisConfig,
    reference::ReferenceTables,
    rng::StreamRng,
    types::{Age, Gender, Isk, Status, INCOME_START_AGE},
};

pub struct StatusClassifier<'a> {
    config:    &'a SynthesisConfig,
    reference: &'a ReferenceTables,
}

impl<'a> StatusClassifier<'a> {
    pub fn new(config: &'a SynthesisConfig, reference: &'a ReferenceTables) -> Self {
        Self { config, reference }
    }

    /// Probability of retiring at `age`: zero below the start age,
    /// then a linear ramp reaching 1.0 after `retirement_ramp_years`.
    pub fn retirement_probability(&self, age: Age) -> f64 {
        if age < self.config.retirement_start_age {
            return 0.0;
        }
        let years = f64::from(age - self.config.retirement_start_age) + 1.0;
        (years / self.config.retirement_ramp_years).min(1.0)
    }

    /// Reference employment rate (default when the cohort is absent),
    /// scaled down for individuals with very low synthesised income.
    pub fn employment_probability(&self, age: Age, gender: Gender, total_income: Isk) -> f64 {
        let rate = self
            .reference
            .employment_rate(age, gender)
            .unwrap_or(self.config.default_employment_rate);
        let income_factor = (total_income / self.config.employment_income_scale).min(1.0);
        rate * income_factor
    }

    pub fn student_probability(&self, age: Age) -> f64 {
        let span = f64::from(self.config.student_decay_end_age - INCOME_START_AGE);
        let years = f64::from(age) - f64::from(INCOME_START_AGE);
        (1.0 - years / span).max(self.config.student_probability_floor)
    }

    pub fn classify(
        &self,
        age: Age,
        gender: Gender,
        total_income: Isk,
        rng: &mut StreamRng,
    ) -> Status {
        if age < INCOME_START_AGE {
            return Status::Student;
        }

        if age >= self.config.retirement_start_age
            && rng.chance(self.retirement_probability(age))
        {
            return Status::Retired;
        }

        if rng.chance(self.employment_probability(age, gender, total_income)) {
            return Status::Employed;
        }

        if rng.chance(self.student_probability(age)) {
            Status::Student
        } else {
            Status::Disabled
        }
    }
}

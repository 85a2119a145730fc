//! Prescription line items and derived quantity arithmetic.
//!
//! Dosage and frequency arrive as clinician free text ("2 viên",
//! "3 lần/ngày"); the derived quantities extract the first number from each.
//! The extraction returns `None` when either field carries no digits, so
//! callers can distinguish "not computable" from zero.
//
// TODO: a structured dosage type (count + unit) would remove the free-text
// extraction here, but it changes what clinicians see in the form, so it
// needs product sign-off first.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::workflow::FieldViolation;

static LEADING_NUMBER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\d+").expect("static pattern compiles"));

/// One prescribed medicine on the visit's prescription list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionEntry {
    /// Medicine display name.
    pub medicine: String,
    /// Free-text dosage, e.g. "2 viên".
    pub dosage: String,
    /// Free-text frequency, e.g. "3 lần/ngày".
    pub frequency: String,
    /// Course length in days. Defaults to 1 when unspecified.
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,
    /// Free-text usage instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_duration_days() -> u32 {
    1
}

impl PrescriptionEntry {
    /// Validates the entry before it is added to the local prescription list.
    ///
    /// Medicine, dosage and frequency are required; duration below 1 is
    /// rejected rather than silently clamped.
    ///
    /// # Errors
    ///
    /// Returns the full list of violations, one per missing or invalid field.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        if self.medicine.trim().is_empty() {
            violations.push(FieldViolation::required("Medicine"));
        }
        if self.dosage.trim().is_empty() {
            violations.push(FieldViolation::required("Dosage"));
        }
        if self.frequency.trim().is_empty() {
            violations.push(FieldViolation::required("Frequency"));
        }
        if self.duration_days == 0 {
            violations.push(FieldViolation::invalid("Duration", "must be at least 1 day"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Units taken per day: first number in dosage × first number in
    /// frequency.
    ///
    /// Returns `None` when either field contains no digits.
    pub fn quantity_per_day(&self) -> Option<u32> {
        let per_dose = extract_first_number(&self.dosage)?;
        let doses_per_day = extract_first_number(&self.frequency)?;
        per_dose.checked_mul(doses_per_day)
    }

    /// Total units for the whole course: per-day quantity × duration.
    pub fn total_quantity(&self) -> Option<u32> {
        self.quantity_per_day()?.checked_mul(self.duration_days)
    }
}

/// Extracts the first unsigned integer embedded in free text.
fn extract_first_number(text: &str) -> Option<u32> {
    LEADING_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}
